use serde::{Deserialize, Serialize};

use shelflife_core::Item;

/// The single terminal event of one item.
///
/// Carries a copy of the item taken when the event was decided, so the
/// content is stable regardless of what happens to the store afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "item", rename_all = "snake_case")]
pub enum Notification {
    /// The item was actively extracted by a caller.
    Extracted(Item),
    /// The item reached its expiration without being extracted.
    Expired(Item),
}

impl Notification {
    /// Stable event name (e.g. "inventory.item.expired").
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::Extracted(_) => "inventory.item.extracted",
            Notification::Expired(_) => "inventory.item.expired",
        }
    }

    pub fn item(&self) -> &Item {
        match self {
            Notification::Extracted(item) | Notification::Expired(item) => item,
        }
    }

    pub fn label(&self) -> &str {
        self.item().label()
    }

    pub fn is_expiry(&self) -> bool {
        matches!(self, Notification::Expired(_))
    }
}

impl core::fmt::Display for Notification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Notification::Extracted(item) => write!(
                f,
                "Item extracted with label {}, expiry {} and type {}",
                item.label(),
                item.expiration(),
                item.item_type()
            ),
            // Expiry is implicitly "now", so the timestamp is left out.
            Notification::Expired(item) => write!(
                f,
                "Item expired with label {} and type {}",
                item.label(),
                item.item_type()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item() -> Item {
        Item::new("foo", Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(), "type1")
    }

    #[test]
    fn extracted_text_includes_expiration() {
        let text = Notification::Extracted(item()).to_string();
        assert_eq!(
            text,
            "Item extracted with label foo, expiry 2026-01-01 12:00:00 UTC and type type1"
        );
    }

    #[test]
    fn expired_text_omits_expiration() {
        let text = Notification::Expired(item()).to_string();
        assert_eq!(text, "Item expired with label foo and type type1");
    }

    #[test]
    fn event_types_are_stable() {
        assert_eq!(Notification::Extracted(item()).event_type(), "inventory.item.extracted");
        assert_eq!(Notification::Expired(item()).event_type(), "inventory.item.expired");
        assert!(Notification::Expired(item()).is_expiry());
        assert_eq!(Notification::Extracted(item()).label(), "foo");
    }
}
