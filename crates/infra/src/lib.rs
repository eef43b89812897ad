//! Infrastructure layer: ledger stores, the inventory service and configuration.

pub mod config;
pub mod inventory_service;
pub mod store;

pub use config::{Config, ConfigError, StoreBackend};
pub use inventory_service::{
    InventoryService, LedgerStats, NewProduct, Page, ProductDetails, Reconciliation, ServiceError,
    ServiceResult, StockMovement, StockRequest,
};
