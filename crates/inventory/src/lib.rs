//! `shelflife-inventory` — transient catalogue of perishable items.
//!
//! Items are keyed by a unique label and carry an expiration instant. Every
//! item ends with exactly one terminal notification: it is either extracted
//! by a caller or expires unextracted.
//!
//! ## Components
//!
//! - `ItemStore`: keyed container, no internal locking
//! - `NotificationScheduler`: one expiry timer per live label, dispatch to the
//!   injected notifier
//! - `InventoryService`: the add / extract / list contract over both
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use shelflife_core::Item;
//! use shelflife_events::TracingNotifier;
//! use shelflife_inventory::InventoryService;
//!
//! let service = InventoryService::new(Arc::new(TracingNotifier::new()));
//! service
//!     .add(Item::new("milk", Utc::now() + Duration::days(3), "dairy"))
//!     .unwrap();
//!
//! let milk = service.extract_by_label("milk").unwrap();
//! assert_eq!(milk.label(), "milk");
//! service.flush();
//! ```

pub mod config;
mod deferred;
pub mod lifecycle;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::{ConfigError, InventoryConfig};
pub use lifecycle::ItemState;
pub use scheduler::NotificationScheduler;
pub use service::InventoryService;
pub use store::ItemStore;
