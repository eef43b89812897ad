use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockledger_core::{InventoryItemId, ProductId, TransactionId};
use stockledger_inventory::{InventoryItem, Product, StockDelta, Transaction};

use super::pagination::Pagination;

/// Ledger store operation error.
///
/// These are **infrastructure errors** (missing rows, uniqueness, storage health)
/// as opposed to domain errors (validation, stock guards).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A unique constraint rejected the write (duplicate SKU, duplicate id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referential or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence of [`Product`] rows.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create_product(&self, product: &Product) -> StoreResult<()>;

    async fn get_product_by_id(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn get_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>>;

    /// Newest first.
    async fn list_products(&self, page: Pagination) -> StoreResult<Vec<Product>>;

    /// Overwrite the editable fields. `NotFound` if the product is gone.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;

    /// Delete a product together with its inventory item and transactions.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    async fn count_products(&self) -> StoreResult<u64>;
}

/// Persistence of [`InventoryItem`] rows.
///
/// `quantity` and `reserved` change only through [`InventoryStore::apply_guarded_delta`].
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn create_inventory_item(&self, item: &InventoryItem) -> StoreResult<()>;

    async fn get_inventory_by_id(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>>;

    async fn get_inventory_by_product_id(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Option<InventoryItem>>;

    /// Newest first.
    async fn list_inventory(&self, page: Pagination) -> StoreResult<Vec<InventoryItem>>;

    /// Write the non-stock fields (`location`, `updated_at`) of `item`.
    /// Its `quantity` and `reserved` are ignored.
    async fn update_inventory_fields(&self, item: &InventoryItem) -> StoreResult<()>;

    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()>;

    /// Apply `delta` to the item atomically with its guard.
    ///
    /// Returns the updated item, or `None` when no row was affected: either the
    /// guard rejected the delta or the item does not exist.
    async fn apply_guarded_delta(
        &self,
        id: InventoryItemId,
        delta: StockDelta,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<InventoryItem>>;
}

/// Append-only persistence of [`Transaction`] entries.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create_transaction(&self, transaction: &Transaction) -> StoreResult<()>;

    async fn get_transaction_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;

    /// Newest first.
    async fn list_transactions_by_inventory(
        &self,
        inventory_id: InventoryItemId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>>;

    /// Newest first.
    async fn list_transactions_by_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>>;

    /// Newest first.
    async fn list_transactions(&self, page: Pagination) -> StoreResult<Vec<Transaction>>;

    /// Every transaction of a product, oldest first.
    async fn load_product_ledger(&self, product_id: ProductId) -> StoreResult<Vec<Transaction>>;

    async fn count_transactions(&self) -> StoreResult<u64>;
}

/// The full ledger store consumed by the inventory service.
#[async_trait]
pub trait LedgerStore: ProductStore + InventoryStore + TransactionStore {
    /// Persist a product and its inventory item together: both or neither.
    async fn register_product(&self, product: &Product, item: &InventoryItem) -> StoreResult<()>;
}

#[async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn create_product(&self, product: &Product) -> StoreResult<()> {
        (**self).create_product(product).await
    }

    async fn get_product_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).get_product_by_id(id).await
    }

    async fn get_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        (**self).get_product_by_sku(sku).await
    }

    async fn list_products(&self, page: Pagination) -> StoreResult<Vec<Product>> {
        (**self).list_products(page).await
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        (**self).update_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        (**self).delete_product(id).await
    }

    async fn count_products(&self) -> StoreResult<u64> {
        (**self).count_products().await
    }
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn create_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        (**self).create_inventory_item(item).await
    }

    async fn get_inventory_by_id(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        (**self).get_inventory_by_id(id).await
    }

    async fn get_inventory_by_product_id(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Option<InventoryItem>> {
        (**self).get_inventory_by_product_id(product_id).await
    }

    async fn list_inventory(&self, page: Pagination) -> StoreResult<Vec<InventoryItem>> {
        (**self).list_inventory(page).await
    }

    async fn update_inventory_fields(&self, item: &InventoryItem) -> StoreResult<()> {
        (**self).update_inventory_fields(item).await
    }

    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()> {
        (**self).delete_inventory_item(id).await
    }

    async fn apply_guarded_delta(
        &self,
        id: InventoryItemId,
        delta: StockDelta,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<InventoryItem>> {
        (**self).apply_guarded_delta(id, delta, now).await
    }
}

#[async_trait]
impl<S> TransactionStore for Arc<S>
where
    S: TransactionStore + ?Sized,
{
    async fn create_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        (**self).create_transaction(transaction).await
    }

    async fn get_transaction_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        (**self).get_transaction_by_id(id).await
    }

    async fn list_transactions_by_inventory(
        &self,
        inventory_id: InventoryItemId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>> {
        (**self).list_transactions_by_inventory(inventory_id, page).await
    }

    async fn list_transactions_by_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>> {
        (**self).list_transactions_by_product(product_id, page).await
    }

    async fn list_transactions(&self, page: Pagination) -> StoreResult<Vec<Transaction>> {
        (**self).list_transactions(page).await
    }

    async fn load_product_ledger(&self, product_id: ProductId) -> StoreResult<Vec<Transaction>> {
        (**self).load_product_ledger(product_id).await
    }

    async fn count_transactions(&self) -> StoreResult<u64> {
        (**self).count_transactions().await
    }
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn register_product(&self, product: &Product, item: &InventoryItem) -> StoreResult<()> {
        (**self).register_product(product, item).await
    }
}
