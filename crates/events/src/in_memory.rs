//! In-memory notifier for tests/dev.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, mpsc};
use std::time::Duration;

use crate::envelope::NotificationEnvelope;
use crate::notifier::Notifier;

/// A subscription to the notifications published by an [`InMemoryNotifier`].
///
/// Each subscription receives a copy of every envelope published after it
/// was created, in publication order.
///
/// ```ignore
/// let notifier = Arc::new(InMemoryNotifier::new());
/// let subscription = notifier.subscribe();
///
/// match subscription.recv_timeout(Duration::from_secs(1)) {
///     Ok(envelope) => println!("{envelope}"),
///     Err(mpsc::RecvTimeoutError::Timeout) => { /* nothing yet */ }
///     Err(mpsc::RecvTimeoutError::Disconnected) => { /* notifier dropped */ }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<NotificationEnvelope>,
}

impl Subscription {
    pub fn new(receiver: mpsc::Receiver<NotificationEnvelope>) -> Self {
        Self { receiver }
    }

    /// Block until the next envelope is available.
    pub fn recv(&self) -> Result<NotificationEnvelope, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an envelope without blocking.
    pub fn try_recv(&self) -> Result<NotificationEnvelope, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for an envelope.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<NotificationEnvelope, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything received so far, without blocking.
    pub fn drain(&self) -> Vec<NotificationEnvelope> {
        self.receiver.try_iter().collect()
    }
}

/// In-memory notifier.
///
/// - No IO
/// - Best-effort fan-out to subscribers
/// - Counts every dispatch, subscribed or not
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    subscribers: Mutex<Vec<mpsc::Sender<NotificationEnvelope>>>,
    calls: AtomicUsize,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription::new(rx)
    }

    /// Number of envelopes dispatched to this notifier so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, envelope: &NotificationEnvelope) {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(envelope.clone()).is_ok());
    }
}
