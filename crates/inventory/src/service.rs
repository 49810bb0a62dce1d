//! The public inventory contract: add, extract, list.
//!
//! ## Locking
//!
//! The store lock serializes every store mutation. The scheduler has its own
//! lock. When both are needed on one path the order is always store, then
//! scheduler; the timer thread only ever takes the scheduler lock.
//!
//! ## Two-phase extraction
//!
//! `extract_by_label` looks the item up, commits it to removal, and returns a
//! copy to the caller right away. Physical removal and the "extracted"
//! notification run later on the removal worker. Use [`InventoryService::flush`]
//! to wait for them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use shelflife_core::{InventoryError, InventoryResult, Item};
use shelflife_events::Notifier;

use crate::config::InventoryConfig;
use crate::deferred::DeferredQueue;
use crate::lifecycle::{ItemState, Lifecycle, RemovalClaim};
use crate::scheduler::NotificationScheduler;
use crate::store::ItemStore;

/// Work handed to the removal worker by a successful extraction.
struct RemovalJob {
    item: Item,
    lifecycle: Arc<Lifecycle>,
    announce: bool,
}

struct Shared {
    name: String,
    store: Mutex<ItemStore>,
    scheduler: NotificationScheduler,
}

impl Shared {
    fn lock_store(&self) -> MutexGuard<'_, ItemStore> {
        // Every store operation is all-or-nothing, so a poisoned lock still
        // guards a consistent map.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete_removal(&self, job: RemovalJob) {
        let mut store = self.lock_store();
        let label = job.item.label();
        match store.remove_by_label(label) {
            Ok(_) => debug!(inventory = %self.name, label, "removed extracted item"),
            // Already removed: tolerated silently.
            Err(_) => debug!(inventory = %self.name, label, "extracted item already gone"),
        }
        self.scheduler
            .settle_extraction(job.item, &job.lifecycle, job.announce);
    }
}

/// Transient in-memory catalogue of perishable items.
///
/// Emits exactly one notification per stored item: "extracted" when a caller
/// extracts it, or "expired" when its expiration passes first.
pub struct InventoryService {
    shared: Arc<Shared>,
    removals: DeferredQueue<RemovalJob>,
    config: InventoryConfig,
}

impl InventoryService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(notifier, InventoryConfig::default())
    }

    pub fn with_config(notifier: Arc<dyn Notifier>, config: InventoryConfig) -> Self {
        Self::preloaded(notifier, config, Vec::<Item>::new())
    }

    /// Build a service over pre-existing items (e.g. loaded from durable
    /// storage), then arm an expiry timer for every stored item.
    ///
    /// Pre-loaded items skip the future-expiration check; those already due
    /// expire right away. On duplicate labels the first item wins.
    pub fn preloaded(
        notifier: Arc<dyn Notifier>,
        config: InventoryConfig,
        items: impl IntoIterator<Item = Item>,
    ) -> Self {
        let mut store = ItemStore::new();
        for item in items {
            if let Err(e) = store.load(item) {
                warn!(inventory = %config.name, error = %e, "skipping pre-loaded item");
            }
        }

        let shared = Arc::new(Shared {
            name: config.name.clone(),
            store: Mutex::new(store),
            scheduler: NotificationScheduler::with_name(notifier, config.name.clone()),
        });

        let worker_shared = shared.clone();
        let removals = DeferredQueue::spawn(
            format!("{}-removals", config.name),
            move |job: RemovalJob| worker_shared.complete_removal(job),
        );

        let service = Self {
            shared,
            removals,
            config,
        };
        service.arm_stored_items();
        service
    }

    fn arm_stored_items(&self) {
        let store = self.shared.lock_store();
        for entry in store.entries() {
            self.shared
                .scheduler
                .arm(entry.item.clone(), entry.lifecycle.clone());
        }
        info!(inventory = %self.config.name, items = store.len(), "inventory service started");
    }

    /// Store `item` and arm its expiry timer.
    ///
    /// Fails with `DuplicateLabel` or `ExpirationInPast`; nothing changes on
    /// failure.
    pub fn add(&self, item: Item) -> InventoryResult<()> {
        let mut store = self.shared.lock_store();
        let lifecycle = store.admit(item.clone(), Utc::now())?;
        debug!(inventory = %self.config.name, label = item.label(), "added item");
        self.shared.scheduler.arm(item, lifecycle);
        Ok(())
    }

    /// Hand the item to the caller and schedule its removal.
    ///
    /// The returned value is the stored item. Removal from the store and the
    /// "extracted" notification complete asynchronously. A label already
    /// committed to removal reports `NotFound`.
    pub fn extract_by_label(&self, label: &str) -> InventoryResult<Item> {
        let job = {
            let store = self.shared.lock_store();
            let entry = store
                .entry(label)
                .ok_or_else(|| InventoryError::not_found(label))?;
            let claim = entry
                .lifecycle
                .claim_removal()
                .ok_or_else(|| InventoryError::not_found(label))?;

            RemovalJob {
                item: entry.item.clone(),
                lifecycle: entry.lifecycle.clone(),
                announce: claim == RemovalClaim::Announce,
            }
        };

        let item = job.item.clone();
        debug!(inventory = %self.config.name, label, announce = job.announce, "extracting item");
        if !self.removals.submit(job) {
            warn!(inventory = %self.config.name, label, "removal worker unavailable");
        }
        Ok(item)
    }

    /// Copy of one stored item. Expired items stay visible until extracted.
    pub fn get_by_label(&self, label: &str) -> InventoryResult<Item> {
        self.shared.lock_store().get_by_label(label).cloned()
    }

    /// Point-in-time snapshot of every stored item.
    pub fn list_items(&self) -> Vec<Item> {
        self.shared.lock_store().list_all()
    }

    pub fn len(&self) -> usize {
        self.shared.lock_store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock_store().is_empty()
    }

    /// Lifecycle state of the stored entry for `label`, if any.
    pub fn item_state(&self, label: &str) -> Option<ItemState> {
        self.shared
            .lock_store()
            .entry(label)
            .map(|entry| entry.lifecycle.state())
    }

    /// Expiry timers armed and not yet fired or cancelled.
    pub fn pending_expiries(&self) -> usize {
        self.shared.scheduler.pending_count()
    }

    /// Extractions whose removal has not completed yet.
    pub fn pending_removals(&self) -> usize {
        self.removals.in_flight()
    }

    /// Wait, up to the configured `flush_timeout`, for every extraction
    /// issued so far to be removed and notified.
    pub fn flush(&self) -> bool {
        self.flush_timeout(self.config.flush_timeout)
    }

    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.removals.flush(timeout)
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }
}

impl core::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryService")
            .field("name", &self.config.name)
            .field("items", &self.len())
            .field("pending_expiries", &self.pending_expiries())
            .field("pending_removals", &self.pending_removals())
            .finish()
    }
}
