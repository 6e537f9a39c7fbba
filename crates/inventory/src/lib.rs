//! Inventory domain module (per-store stock levels).
//!
//! Only the restock path the receiving flow depends on lives here, implemented
//! purely as deterministic domain logic (no IO, no storage).

pub mod item;

pub use item::{
    InventoryCommand, InventoryEvent, ItemTracked, Restock, StockItem, StockItemId, StockRestocked,
    TrackItem,
};
