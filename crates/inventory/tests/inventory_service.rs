use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use shelflife_core::{InventoryError, Item};
use shelflife_events::{InMemoryNotifier, Subscription};
use shelflife_inventory::{InventoryConfig, InventoryService, ItemState};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    service: InventoryService,
    notifier: Arc<InMemoryNotifier>,
    subscription: Subscription,
}

impl Harness {
    fn new() -> Self {
        Self::preloaded(Vec::new())
    }

    fn preloaded(items: Vec<Item>) -> Self {
        shelflife_observability::init();

        let notifier = Arc::new(InMemoryNotifier::new());
        let subscription = notifier.subscribe();
        let config = InventoryConfig::default()
            .with_name("test-inventory")
            .with_flush_timeout(WAIT);
        let service = InventoryService::preloaded(notifier.clone(), config, items);

        Self {
            service,
            notifier,
            subscription,
        }
    }

    fn insert_fixture_items(&self) -> Vec<Item> {
        let items: Vec<Item> = ["foo", "bar", "biz"]
            .into_iter()
            .map(|label| item_in(label, ChronoDuration::minutes(5)))
            .collect();
        for item in &items {
            self.service.add(item.clone()).unwrap();
        }
        items
    }
}

fn item_in(label: &str, delta: ChronoDuration) -> Item {
    Item::new(label, Utc::now() + delta, "type1")
}

#[test]
fn add_enforces_uniqueness_and_future_expiration() {
    let h = Harness::new();
    assert_eq!(h.service.len(), 0);
    h.insert_fixture_items();
    assert_eq!(h.service.len(), 3);

    let err = h
        .service
        .add(item_in("foo", ChronoDuration::minutes(5)))
        .unwrap_err();
    assert_eq!(err, InventoryError::duplicate("foo"));
    assert_eq!(err.to_string(), "item with label foo exists in inventory");
    assert_eq!(h.service.len(), 3);

    let err = h
        .service
        .add(item_in("qux", ChronoDuration::minutes(-5)))
        .unwrap_err();
    assert_eq!(err, InventoryError::ExpirationInPast);
    assert_eq!(h.service.len(), 3);
    assert_eq!(h.service.pending_expiries(), 3);
}

#[test]
fn extract_returns_the_inserted_items_then_removes_them() {
    let h = Harness::new();
    let items = h.insert_fixture_items();

    for expected in &items {
        let extracted = h.service.extract_by_label(expected.label()).unwrap();
        assert_eq!(&extracted, expected);
    }

    assert!(h.service.flush());
    assert!(h.service.is_empty());
    assert!(h.service.list_items().is_empty());

    let err = h.service.extract_by_label("qux").unwrap_err();
    assert_eq!(err.to_string(), "no item with label qux exists in inventory");
}

#[test]
fn extraction_before_expiry_notifies_once() {
    let h = Harness::new();
    let item = item_in("foo", ChronoDuration::milliseconds(300));
    h.service.add(item.clone()).unwrap();

    let extracted = h.service.extract_by_label("foo").unwrap();
    assert_eq!(extracted, item);

    let envelope = h.subscription.recv_timeout(WAIT).unwrap();
    assert_eq!(envelope.notification().event_type(), "inventory.item.extracted");
    assert_eq!(envelope.notification().item(), &item);
    assert!(h.service.flush());
    assert!(h.service.is_empty());

    // Past the original expiration, nothing else fires.
    thread::sleep(Duration::from_millis(600));
    assert_eq!(h.notifier.calls(), 1);
    assert_eq!(h.service.pending_expiries(), 0);
}

#[test]
fn unextracted_item_expires_once_and_stays_listed() {
    let h = Harness::new();
    let item = item_in("foo", ChronoDuration::milliseconds(200));
    h.service.add(item.clone()).unwrap();
    assert_eq!(h.notifier.calls(), 0);

    let envelope = h.subscription.recv_timeout(WAIT).unwrap();
    assert!(envelope.notification().is_expiry());
    assert_eq!(
        envelope.to_string(),
        "Item expired with label foo and type type1"
    );

    thread::sleep(Duration::from_millis(200));
    assert_eq!(h.notifier.calls(), 1);

    // Expiry only disarms the timer; the entry remains until extracted.
    assert_eq!(h.service.list_items(), vec![item.clone()]);
    assert_eq!(h.service.get_by_label("foo").unwrap(), item);
    assert_eq!(h.service.item_state("foo"), Some(ItemState::Expired));
    assert_eq!(h.service.pending_expiries(), 0);
}

#[test]
fn extracting_an_expired_item_removes_it_silently() {
    let h = Harness::new();
    h.service
        .add(item_in("foo", ChronoDuration::milliseconds(50)))
        .unwrap();
    h.subscription.recv_timeout(WAIT).unwrap();

    let extracted = h.service.extract_by_label("foo").unwrap();
    assert_eq!(extracted.label(), "foo");
    assert!(h.service.flush());

    assert!(h.service.is_empty());
    assert_eq!(h.notifier.calls(), 1);
}

#[test]
fn every_added_item_ends_with_one_notification() {
    let h = Harness::new();
    h.service
        .add(item_in("foo", ChronoDuration::milliseconds(100)))
        .unwrap();
    h.service
        .add(item_in("bar", ChronoDuration::milliseconds(100)))
        .unwrap();

    thread::sleep(Duration::from_millis(400));
    assert_eq!(h.notifier.calls(), 2);
}

#[test]
fn concurrent_adds_and_extractions_on_disjoint_labels() {
    let Harness {
        service,
        notifier,
        subscription,
    } = Harness::new();
    let service = Arc::new(service);
    let threads: usize = 8;
    let per_thread: usize = 25;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let service = service.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    let item = item_in(&format!("t{t}-i{i}"), ChronoDuration::minutes(5));
                    service.add(item.clone()).unwrap();
                    // Extract every other item.
                    if i % 2 == 0 {
                        let extracted = service.extract_by_label(item.label()).unwrap();
                        assert_eq!(extracted, item);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(service.flush());

    let extracted_per_thread = per_thread.div_ceil(2);
    let kept = threads * (per_thread - extracted_per_thread);
    assert_eq!(service.len(), kept);
    assert_eq!(service.pending_expiries(), kept);
    assert_eq!(notifier.calls(), threads * extracted_per_thread);

    let mut per_label: HashMap<String, usize> = HashMap::new();
    for envelope in subscription.drain() {
        assert_eq!(envelope.notification().event_type(), "inventory.item.extracted");
        *per_label.entry(envelope.notification().label().to_string()).or_default() += 1;
    }
    assert_eq!(per_label.len(), threads * extracted_per_thread);
    assert!(per_label.values().all(|&n| n == 1));
}

// Timing-based: extractions land around the expiry instant, so some rounds
// hit the interleaving and most do not. The claim race itself is covered
// deterministically by `lifecycle::tests::racing_claims_announce_exactly_once`.
#[test]
fn racing_extraction_and_expiry_notify_exactly_once() {
    let h = Harness::new();
    let rounds = 40;

    for round in 0..rounds {
        let label = format!("race-{round}");
        h.service
            .add(item_in(&label, ChronoDuration::milliseconds(20)))
            .unwrap();
        thread::sleep(Duration::from_millis(19));
        let _ = h.service.extract_by_label(&label);
    }

    assert!(h.service.flush());
    thread::sleep(Duration::from_millis(200));

    let mut per_label: HashMap<String, usize> = HashMap::new();
    for envelope in h.subscription.drain() {
        *per_label.entry(envelope.notification().label().to_string()).or_default() += 1;
    }
    assert_eq!(per_label.len(), rounds);
    assert!(per_label.values().all(|&n| n == 1));
    assert!(h.service.is_empty());
}

#[test]
fn preloaded_items_are_rearmed() {
    let fresh = item_in("fresh", ChronoDuration::milliseconds(150));
    let stale = item_in("stale", ChronoDuration::minutes(-5));
    let later = item_in("later", ChronoDuration::minutes(5));
    let duplicate = Item::new("later", Utc::now() + ChronoDuration::minutes(10), "type2");

    let h = Harness::preloaded(vec![fresh, stale, later.clone(), duplicate]);
    assert_eq!(h.service.len(), 3);
    assert_eq!(h.service.get_by_label("later").unwrap(), later);

    let first = h.subscription.recv_timeout(WAIT).unwrap();
    let second = h.subscription.recv_timeout(WAIT).unwrap();
    assert_eq!(first.notification().label(), "stale");
    assert_eq!(second.notification().label(), "fresh");
    assert!(first.notification().is_expiry() && second.notification().is_expiry());

    assert_eq!(h.service.pending_expiries(), 1);
    assert_eq!(h.service.len(), 3);
}

#[test]
fn list_items_is_a_snapshot() {
    let h = Harness::new();
    let items = h.insert_fixture_items();

    let snapshot = h.service.list_items();
    h.service.extract_by_label("foo").unwrap();
    assert!(h.service.flush());

    assert_eq!(snapshot.len(), items.len());
    let by_label: HashMap<_, _> = snapshot.iter().map(|i| (i.label(), i)).collect();
    for item in &items {
        assert_eq!(by_label[item.label()], item);
    }
    assert_eq!(h.service.list_items().len(), 2);
}
