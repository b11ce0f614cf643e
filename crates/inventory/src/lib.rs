//! `tillpoint-inventory` — inventory item row model.

pub mod item;

pub use item::{InventoryItem, ItemPatch, NewItem};
