//! `shelflife-core` — perishable item building blocks.
//!
//! This crate contains **pure** primitives (no threads, no IO): the item
//! record and the error taxonomy shared by the inventory and events crates.

pub mod error;
pub mod item;

pub use error::{InventoryError, InventoryResult};
pub use item::Item;
