//! Inventory error model.

use thiserror::Error;

/// Result type used across the inventory layer.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Local, synchronous validation failures.
///
/// None of these are fatal to a running service; callers decide whether to
/// retry. Deferred paths (timer callbacks, background removals) never surface
/// errors since nobody is waiting on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// An entry with the same label is already stored.
    #[error("item with label {0} exists in inventory")]
    DuplicateLabel(String),

    /// The expiration was not strictly after the instant of the add.
    #[error("expiration may not be set in the past")]
    ExpirationInPast,

    /// No entry with the given label is stored.
    #[error("no item with label {0} exists in inventory")]
    NotFound(String),
}

impl InventoryError {
    pub fn duplicate(label: impl Into<String>) -> Self {
        Self::DuplicateLabel(label.into())
    }

    pub fn not_found(label: impl Into<String>) -> Self {
        Self::NotFound(label.into())
    }

    /// The label this error refers to, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            InventoryError::DuplicateLabel(label) | InventoryError::NotFound(label) => Some(label),
            InventoryError::ExpirationInPast => None,
        }
    }
}
