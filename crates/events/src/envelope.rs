use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::Notification;

/// Envelope handed to notifiers: the notification plus dispatch metadata.
///
/// - `notification_id` is a UUIDv7, so ids sort by dispatch time.
/// - `dispatched_at` is wall-clock time at dispatch, not the item expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    notification_id: Uuid,
    dispatched_at: DateTime<Utc>,
    notification: Notification,
}

impl NotificationEnvelope {
    pub fn new(notification_id: Uuid, dispatched_at: DateTime<Utc>, notification: Notification) -> Self {
        Self {
            notification_id,
            dispatched_at,
            notification,
        }
    }

    /// Wrap a notification being dispatched right now.
    pub fn now(notification: Notification) -> Self {
        Self::new(Uuid::now_v7(), Utc::now(), notification)
    }

    pub fn notification_id(&self) -> Uuid {
        self.notification_id
    }

    pub fn dispatched_at(&self) -> DateTime<Utc> {
        self.dispatched_at
    }

    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    pub fn into_notification(self) -> Notification {
        self.notification
    }

    /// Machine-readable rendering for transports that want JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl core::fmt::Display for NotificationEnvelope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.notification, f)
    }
}
