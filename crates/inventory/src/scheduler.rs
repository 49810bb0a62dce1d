//! Expiry timers and notification dispatch.
//!
//! ## Design
//!
//! - One timer thread per scheduler, sleeping on a `Condvar` until the
//!   earliest deadline (or until a new timer is armed / shutdown is requested)
//! - At most one `PendingTimer` per label; re-arming a label replaces it
//! - Dispatch and pending-timer bookkeeping share one mutex, so a cancel
//!   either removes the timer before it fires or finds it already gone
//! - The notifier is invoked synchronously while that mutex is held
//!
//! Deadlines are keyed by `(due, timer id)`. Cancelling or replacing a timer
//! removes its exact key, so the deadline set never outgrows the pending map.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, trace};

use shelflife_core::Item;
use shelflife_events::{Notification, NotificationEnvelope, Notifier};

use crate::lifecycle::Lifecycle;

type TimerId = u64;

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    due: Instant,
    item: Item,
    lifecycle: Arc<Lifecycle>,
}

#[derive(Default)]
struct TimerState {
    pending: HashMap<String, PendingTimer>,
    deadlines: BTreeMap<(Instant, TimerId), String>,
    next_id: TimerId,
    shutdown: bool,
}

impl TimerState {
    /// Drop the pending timer for `label` together with its deadline.
    fn cancel(&mut self, label: &str) -> Option<PendingTimer> {
        let timer = self.pending.remove(label)?;
        self.deadlines.remove(&(timer.due, timer.id));
        Some(timer)
    }
}

struct Shared {
    name: String,
    state: Mutex<TimerState>,
    wake: Condvar,
    notifier: Arc<dyn Notifier>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke the notifier, containing any panic so the calling thread survives.
    fn dispatch(&self, notification: Notification) {
        let envelope = NotificationEnvelope::now(notification);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.notifier.notify(&envelope)));
        if outcome.is_err() {
            error!(
                scheduler = %self.name,
                notification_id = %envelope.notification_id(),
                label = envelope.notification().label(),
                "notifier panicked"
            );
        }
    }
}

/// Tracks one outstanding expiry timer per live label.
///
/// Dropping the scheduler stops its timer thread; timers that have not fired
/// yet are discarded.
pub struct NotificationScheduler {
    shared: Arc<Shared>,
    timer_thread: Option<thread::JoinHandle<()>>,
}

impl NotificationScheduler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_name(notifier, "inventory")
    }

    /// `name` labels the timer thread and log lines.
    pub fn with_name(notifier: Arc<dyn Notifier>, name: impl Into<String>) -> Self {
        let shared = Arc::new(Shared {
            name: name.into(),
            state: Mutex::new(TimerState::default()),
            wake: Condvar::new(),
            notifier,
        });

        let timer_shared = shared.clone();
        let timer_thread = thread::Builder::new()
            .name(format!("{}-timers", shared.name))
            .spawn(move || timer_loop(timer_shared))
            .expect("failed to spawn expiry timer thread");

        Self {
            shared,
            timer_thread: Some(timer_thread),
        }
    }

    /// Arm a one-shot expiry notification at `item.expiration()`.
    ///
    /// An existing timer for the same label is replaced.
    pub fn queue_expiry(&self, item: Item) {
        self.arm(item, Arc::new(Lifecycle::new()));
    }

    pub(crate) fn arm(&self, item: Item, lifecycle: Arc<Lifecycle>) {
        let remaining = item.time_to_expiry(Utc::now());
        let due = Instant::now() + remaining;
        let label = item.label().to_string();

        let mut state = self.shared.lock();
        let id = state.next_id;
        state.next_id += 1;

        if let Some(replaced) = state.cancel(&label) {
            debug!(scheduler = %self.shared.name, label = %label, replaced = replaced.id, "re-armed expiry timer");
        }
        trace!(scheduler = %self.shared.name, label = %label, timer = id, "armed expiry timer");
        state.deadlines.insert((due, id), label.clone());
        state.pending.insert(
            label,
            PendingTimer {
                id,
                due,
                item,
                lifecycle,
            },
        );
        drop(state);

        self.shared.wake.notify_one();
    }

    /// Dispatch an "extracted" notification, then cancel any pending expiry
    /// timer for the item's label.
    ///
    /// This standalone form knows nothing about stored entries: it always
    /// announces and cancels whatever timer the label currently has. The
    /// inventory service goes through `settle_extraction` instead, which
    /// honours the entry's lifecycle guard and only cancels that entry's timer.
    pub fn notify_extraction(&self, item: Item) {
        let mut state = self.shared.lock();
        let label = item.label().to_string();
        self.shared.dispatch(Notification::Extracted(item));
        if let Some(cancelled) = state.cancel(&label) {
            debug!(scheduler = %self.shared.name, label = %label, timer = cancelled.id, "cancelled expiry timer");
        }
    }

    /// Finish an extraction claimed through `lifecycle`.
    ///
    /// Announces only when the extraction won the terminal-event race, and
    /// cancels the pending timer only if it belongs to the same stored entry.
    pub(crate) fn settle_extraction(&self, item: Item, lifecycle: &Arc<Lifecycle>, announce: bool) {
        let mut state = self.shared.lock();
        let label = item.label().to_string();

        if announce {
            self.shared.dispatch(Notification::Extracted(item));
        } else {
            debug!(scheduler = %self.shared.name, label = %label, "expiry already announced, extraction is silent");
        }

        let same_entry = state
            .pending
            .get(&label)
            .is_some_and(|timer| Arc::ptr_eq(&timer.lifecycle, lifecycle));
        if same_entry {
            if let Some(cancelled) = state.cancel(&label) {
                debug!(scheduler = %self.shared.name, label = %label, timer = cancelled.id, "cancelled expiry timer");
            }
        }
    }

    /// Number of armed timers that have neither fired nor been cancelled.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_pending(&self, label: &str) -> bool {
        self.shared.lock().pending.contains_key(label)
    }

    /// Deadlines still held by the timer thread.
    #[cfg(test)]
    pub(crate) fn deadline_count(&self) -> usize {
        self.shared.lock().deadlines.len()
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.timer_thread.take() {
            if handle.join().is_err() {
                error!(scheduler = %self.shared.name, "expiry timer thread panicked");
            }
        }
    }
}

impl core::fmt::Debug for NotificationScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationScheduler")
            .field("name", &self.shared.name)
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn timer_loop(shared: Arc<Shared>) {
    debug!(scheduler = %shared.name, "expiry timer thread started");
    let mut state = shared.lock();

    loop {
        if state.shutdown {
            break;
        }

        let now = Instant::now();
        let next_due = state.deadlines.first_key_value().map(|(&(due, _), _)| due);

        match next_due {
            None => {
                state = shared.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            Some(due) if due > now => {
                state = shared
                    .wake
                    .wait_timeout(state, due - now)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
            Some(_) => {
                if let Some(((_, id), label)) = state.deadlines.pop_first() {
                    fire(&shared, &mut state, id, &label);
                }
            }
        }
    }

    debug!(scheduler = %shared.name, "expiry timer thread stopped");
}

/// Runs with the scheduler lock held.
fn fire(shared: &Shared, state: &mut TimerState, id: TimerId, label: &str) {
    let current = state.pending.get(label).is_some_and(|timer| timer.id == id);
    if !current {
        trace!(scheduler = %shared.name, label, timer = id, "skipping stale deadline");
        return;
    }

    let Some(timer) = state.pending.remove(label) else {
        return;
    };

    if timer.lifecycle.claim_expiry() {
        shared.dispatch(Notification::Expired(timer.item));
    } else {
        debug!(scheduler = %shared.name, label, "extraction already claimed, expiry is silent");
    }
}
