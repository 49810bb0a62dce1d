//! The notifier collaborator (transport-agnostic sink for terminal events).
//!
//! A notifier is injected into the inventory at construction and invoked
//! synchronously for every extraction or expiry dispatch. The concrete
//! transport (log line, webhook, queue) is up to the implementation.
//!
//! ## Blocking
//!
//! `notify` runs while the scheduler holds its internal lock, so a slow
//! notifier delays subsequent timer firings and cancellations. Implementations
//! must not block indefinitely; hand the envelope off to a channel or queue if
//! delivery can stall. A notifier must not call back into the inventory
//! that owns it.
//!
//! ## Delivery
//!
//! Dispatch is best-effort and in-process. There is no retry and no
//! acknowledgement; a notifier that fails to deliver simply loses the message.

use std::sync::Arc;

use crate::envelope::NotificationEnvelope;

/// Receives one envelope per terminal event.
///
/// The trait requires `Send + Sync`: notifications are dispatched from the
/// timer thread and from the removal worker concurrently with callers.
pub trait Notifier: Send + Sync {
    fn notify(&self, envelope: &NotificationEnvelope);
}

impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    fn notify(&self, envelope: &NotificationEnvelope) {
        (**self).notify(envelope)
    }
}
