//! Keyed container of perishable items.
//!
//! `ItemStore` does no locking of its own. It assumes a single writer and is
//! serialized externally by the service that owns it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use shelflife_core::{InventoryError, InventoryResult, Item};

use crate::lifecycle::Lifecycle;

/// A stored item plus the guard shared with its expiry timer.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) item: Item,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

/// Mapping from label to item; at most one entry per label.
#[derive(Debug, Default)]
pub struct ItemStore {
    entries: HashMap<String, Entry>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`, validated against the current instant.
    pub fn add(&mut self, item: Item) -> InventoryResult<()> {
        self.add_at(item, Utc::now())
    }

    /// Insert `item`, validated against `now`.
    ///
    /// Fails with `DuplicateLabel` if the label is taken, or with
    /// `ExpirationInPast` unless the expiration is strictly after `now`.
    /// On failure nothing changes.
    pub fn add_at(&mut self, item: Item, now: DateTime<Utc>) -> InventoryResult<()> {
        self.admit(item, now).map(|_| ())
    }

    pub(crate) fn admit(&mut self, item: Item, now: DateTime<Utc>) -> InventoryResult<Arc<Lifecycle>> {
        if self.entries.contains_key(item.label()) {
            return Err(InventoryError::duplicate(item.label()));
        }
        if item.expiration() <= now {
            return Err(InventoryError::ExpirationInPast);
        }
        Ok(self.insert(item))
    }

    /// Bulk pre-load path: uniqueness is enforced, expiration is not.
    pub(crate) fn load(&mut self, item: Item) -> InventoryResult<()> {
        if self.entries.contains_key(item.label()) {
            return Err(InventoryError::duplicate(item.label()));
        }
        self.insert(item);
        Ok(())
    }

    fn insert(&mut self, item: Item) -> Arc<Lifecycle> {
        let lifecycle = Arc::new(Lifecycle::new());
        self.entries.insert(
            item.label().to_string(),
            Entry {
                item,
                lifecycle: lifecycle.clone(),
            },
        );
        lifecycle
    }

    pub fn get_by_label(&self, label: &str) -> InventoryResult<&Item> {
        self.entries
            .get(label)
            .map(|entry| &entry.item)
            .ok_or_else(|| InventoryError::not_found(label))
    }

    /// Remove and return the entry. Removing an absent label changes nothing.
    pub fn remove_by_label(&mut self, label: &str) -> InventoryResult<Item> {
        self.entries
            .remove(label)
            .map(|entry| entry.item)
            .ok_or_else(|| InventoryError::not_found(label))
    }

    /// Point-in-time copy of every stored item, in no particular order.
    pub fn list_all(&self) -> Vec<Item> {
        self.entries.values().map(|entry| entry.item.clone()).collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entry(&self, label: &str) -> Option<&Entry> {
        self.entries.get(label)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }
}
