//! Terminal-event notifications and the notifier collaborators that receive them.

pub mod envelope;
pub mod in_memory;
pub mod notification;
pub mod notifier;
pub mod tracing_notifier;

pub use envelope::NotificationEnvelope;
pub use in_memory::{InMemoryNotifier, Subscription};
pub use notification::Notification;
pub use notifier::Notifier;
pub use tracing_notifier::TracingNotifier;
