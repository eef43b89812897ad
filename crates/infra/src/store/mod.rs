//! Ledger store boundary.
//!
//! Persistence of products, inventory items and the append-only transaction
//! ledger, with an in-memory backend (tests/dev) and a Postgres backend.

pub mod in_memory;
pub mod pagination;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use pagination::{PageLimits, Pagination};
pub use postgres::PostgresLedgerStore;
pub use r#trait::{
    InventoryStore, LedgerStore, ProductStore, StoreError, StoreResult, TransactionStore,
};
