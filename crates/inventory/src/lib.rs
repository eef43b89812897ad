//! Inventory domain module.
//!
//! Products, their stock records and the append-only transaction ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! The one rule for changing stock lives in [`StockDelta::apply_to`].

pub mod item;
pub mod ledger;
pub mod limits;
pub mod product;
pub mod transaction;

pub use item::{InventoryItem, StockDelta, StockLevel, next_revision_at, validate_location};
pub use ledger::replay;
pub use limits::{
    MAX_LOCATION_LEN, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_REFERENCE_LEN, MAX_SKU_LEN,
};
pub use product::{MAX_PRICE, PRICE_SCALE, Product, ProductDraft, ProductUpdate};
pub use transaction::{
    INITIAL_STOCK_REFERENCE, Transaction, TransactionType, validate_movement_quantity,
};
