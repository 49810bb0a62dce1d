//! The perishable item record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable perishable item, keyed by its label.
///
/// Items are copied by value wherever they travel (notifications, snapshots)
/// so their content never depends on later store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    label: String,
    expiration: DateTime<Utc>,
    #[serde(rename = "type")]
    item_type: String,
}

impl Item {
    pub fn new(
        label: impl Into<String>,
        expiration: DateTime<Utc>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            expiration,
            item_type: item_type.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// An item has expired at `at` iff `at` is strictly after its expiration.
    pub fn has_expired(&self, at: DateTime<Utc>) -> bool {
        at > self.expiration
    }

    /// Time left until expiration, clamped to zero once due.
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expiration - now).to_std().unwrap_or_default()
    }
}
