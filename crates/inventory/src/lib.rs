//! Inventory domain module.
//!
//! Retail and back-bar stock, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod item;

pub use item::{MovementKind, StockAdjustment, StockItem, StockItemDraft, StockItemPatch, StockMovement};
