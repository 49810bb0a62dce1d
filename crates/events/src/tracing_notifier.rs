use crate::envelope::NotificationEnvelope;
use crate::notifier::Notifier;

/// Notifier that emits each terminal event as a structured log line.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier {
    json: bool,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the JSON rendering of the envelope as a `payload` field.
    pub fn with_json_payload(mut self) -> Self {
        self.json = true;
        self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, envelope: &NotificationEnvelope) {
        let notification = envelope.notification();
        let item = notification.item();

        if self.json {
            match envelope.to_json() {
                Ok(payload) => tracing::info!(
                    notification_id = %envelope.notification_id(),
                    event_type = notification.event_type(),
                    label = item.label(),
                    item_type = item.item_type(),
                    payload = %payload,
                    "{envelope}"
                ),
                Err(e) => tracing::warn!(
                    notification_id = %envelope.notification_id(),
                    error = %e,
                    "failed to render notification payload"
                ),
            }
            return;
        }

        tracing::info!(
            notification_id = %envelope.notification_id(),
            event_type = notification.event_type(),
            label = item.label(),
            item_type = item.item_type(),
            "{envelope}"
        );
    }
}
