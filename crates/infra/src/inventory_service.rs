//! Stock movement engine and query surface.
//!
//! Every movement runs in two phases:
//!
//! ```text
//! 1. guarded delta on the inventory item   (authoritative, atomic in the store)
//! 2. append the matching ledger transaction (audit, best-effort)
//! ```
//!
//! A failed phase 2 does not undo phase 1; it surfaces as
//! [`ServiceError::AuditAppendFailed`] carrying the balance that was applied, and
//! [`InventoryService::reconcile`] shows the drift between ledger and balance.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use stockledger_core::{DomainError, InventoryItemId, ProductId, TransactionId};
use stockledger_inventory::{
    INITIAL_STOCK_REFERENCE, InventoryItem, Product, ProductDraft, ProductUpdate, StockLevel,
    Transaction, TransactionType, replay, validate_location, validate_movement_quantity,
};

use crate::store::{LedgerStore, PageLimits, Pagination, StoreError};

const INITIAL_STOCK_NOTE: &str = "Initial stock entry";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("insufficient reserved stock: requested {requested}, reserved {reserved}")]
    InsufficientReservedStock { requested: i64, reserved: i64 },

    /// The stock change is in effect but its ledger entry is missing.
    #[error("stock change applied but the ledger append failed: {reason}")]
    AuditAppendFailed {
        inventory: Box<InventoryItem>,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Constraint(msg) => ServiceError::Validation(msg),
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Input for registering a product with its stock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(flatten)]
    pub draft: ProductDraft,
    pub location: String,
    #[serde(default)]
    pub initial_quantity: i64,
}

/// Input for one stock movement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub quantity: i64,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StockRequest {
    pub fn new(quantity: i64, reference: impl Into<String>) -> Self {
        Self {
            quantity,
            reference: reference.into(),
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub product: Product,
    pub inventory: InventoryItem,
}

/// Outcome of an applied movement: the new balance and its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub inventory: InventoryItem,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub products: u64,
    pub transactions: u64,
}

/// Comparison between the stored balance and the balance the ledger replays to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub product_id: ProductId,
    pub inventory_id: InventoryItemId,
    pub transaction_count: usize,
    /// `None` when the ledger does not replay to a reachable level.
    pub ledger: Option<StockLevel>,
    pub actual: StockLevel,
    pub consistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Postgres keeps microseconds; truncating keeps stored and returned values equal.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone)]
pub struct InventoryService<S> {
    store: S,
    page_limits: PageLimits,
}

impl<S> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self::with_page_limits(store, PageLimits::default())
    }

    pub fn with_page_limits(store: S, page_limits: PageLimits) -> Self {
        Self { store, page_limits }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn page(&self, limit: Option<i64>, offset: Option<i64>) -> Pagination {
        self.page_limits.resolve(limit, offset)
    }
}

impl<S> InventoryService<S>
where
    S: LedgerStore,
{
    /// Register a product together with its inventory item.
    ///
    /// Product and item are persisted atomically. A positive initial quantity is
    /// then recorded as an `IN` entry referenced `INITIAL_STOCK`.
    pub async fn register_product(&self, input: NewProduct) -> ServiceResult<ProductDetails> {
        let now = now();
        let product = Product::new(input.draft, now)?;
        let inventory = InventoryItem::new(product.id, input.initial_quantity, input.location, now)?;

        self.store.register_product(&product, &inventory).await?;
        info!(
            product_id = %product.id,
            inventory_id = %inventory.id,
            sku = %product.sku,
            initial_quantity = inventory.quantity,
            "product registered"
        );

        if inventory.quantity > 0 {
            let transaction = Transaction::record(
                inventory.id,
                product.id,
                TransactionType::In,
                inventory.quantity,
                INITIAL_STOCK_REFERENCE,
                INITIAL_STOCK_NOTE,
                now,
            )?;
            self.append_audit(&inventory, &transaction).await?;
        }

        Ok(ProductDetails { product, inventory })
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<ProductDetails> {
        let product = self
            .store
            .get_product_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))?;
        let inventory = self.inventory_for(product.id).await?;
        Ok(ProductDetails { product, inventory })
    }

    pub async fn get_product_by_sku(&self, sku: &str) -> ServiceResult<ProductDetails> {
        let product = self
            .store
            .get_product_by_sku(sku)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", sku))?;
        let inventory = self.inventory_for(product.id).await?;
        Ok(ProductDetails { product, inventory })
    }

    pub async fn list_products(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Page<Product>> {
        let page = self.page(limit, offset);
        let items = self.store.list_products(page).await?;
        Ok(Page {
            items,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn update_product(&self, id: ProductId, update: ProductUpdate) -> ServiceResult<Product> {
        let current = self
            .store
            .get_product_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))?;
        let updated = current.with_update(update, now())?;
        self.store.update_product(&updated).await?;
        info!(product_id = %id, "product updated");
        Ok(updated)
    }

    /// Delete a product; its inventory item and transactions go with it.
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        self.store.delete_product(id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn add_stock(&self, product_id: ProductId, request: StockRequest) -> ServiceResult<StockMovement> {
        self.apply_movement(product_id, TransactionType::In, request).await
    }

    pub async fn remove_stock(&self, product_id: ProductId, request: StockRequest) -> ServiceResult<StockMovement> {
        self.apply_movement(product_id, TransactionType::Out, request).await
    }

    pub async fn reserve_stock(&self, product_id: ProductId, request: StockRequest) -> ServiceResult<StockMovement> {
        self.apply_movement(product_id, TransactionType::Reserve, request).await
    }

    pub async fn unreserve_stock(&self, product_id: ProductId, request: StockRequest) -> ServiceResult<StockMovement> {
        self.apply_movement(product_id, TransactionType::Unreserve, request).await
    }

    /// Take back units returned by a customer.
    pub async fn return_stock(&self, product_id: ProductId, request: StockRequest) -> ServiceResult<StockMovement> {
        self.apply_movement(product_id, TransactionType::Return, request).await
    }

    /// Move the stock record to another location. Quantities are untouched.
    pub async fn relocate(&self, product_id: ProductId, location: String) -> ServiceResult<InventoryItem> {
        validate_location(&location)?;
        let mut item = self.inventory_for(product_id).await?;
        item.location = location;
        item.updated_at = now();
        self.store.update_inventory_fields(&item).await?;
        info!(product_id = %product_id, location = %item.location, "inventory relocated");

        // Re-read so concurrent stock movements are reflected.
        self.store
            .get_inventory_by_id(item.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory item", item.id))
    }

    pub async fn get_inventory(&self, product_id: ProductId) -> ServiceResult<InventoryItem> {
        self.inventory_for(product_id).await
    }

    pub async fn get_inventory_by_id(&self, id: InventoryItemId) -> ServiceResult<InventoryItem> {
        self.store
            .get_inventory_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory item", id))
    }

    pub async fn list_inventory(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Page<InventoryItem>> {
        let page = self.page(limit, offset);
        let items = self.store.list_inventory(page).await?;
        Ok(Page {
            items,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Transactions of one product, newest first.
    pub async fn list_product_transactions(
        &self,
        product_id: ProductId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Page<Transaction>> {
        if self.store.get_product_by_id(product_id).await?.is_none() {
            return Err(ServiceError::not_found("product", product_id));
        }
        let page = self.page(limit, offset);
        let items = self.store.list_transactions_by_product(product_id, page).await?;
        Ok(Page {
            items,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Transactions of one inventory item, newest first.
    pub async fn list_inventory_transactions(
        &self,
        inventory_id: InventoryItemId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Page<Transaction>> {
        self.get_inventory_by_id(inventory_id).await?;
        let page = self.page(limit, offset);
        let items = self
            .store
            .list_transactions_by_inventory(inventory_id, page)
            .await?;
        Ok(Page {
            items,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn list_transactions(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Page<Transaction>> {
        let page = self.page(limit, offset);
        let items = self.store.list_transactions(page).await?;
        Ok(Page {
            items,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn get_transaction(&self, id: TransactionId) -> ServiceResult<Transaction> {
        self.store
            .get_transaction_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("transaction", id))
    }

    pub async fn stats(&self) -> ServiceResult<LedgerStats> {
        Ok(LedgerStats {
            products: self.store.count_products().await?,
            transactions: self.store.count_transactions().await?,
        })
    }

    /// Replay the product's ledger from zero and compare with the stored balance.
    pub async fn reconcile(&self, product_id: ProductId) -> ServiceResult<Reconciliation> {
        let inventory = self.inventory_for(product_id).await?;
        let ledger = self.store.load_product_ledger(product_id).await?;
        let actual = inventory.level();

        let (replayed, detail) = match replay(&ledger) {
            Ok(level) if level == actual => (Some(level), None),
            Ok(level) => (
                Some(level),
                Some(format!(
                    "ledger replays to quantity={} reserved={}, stored quantity={} reserved={}",
                    level.quantity, level.reserved, actual.quantity, actual.reserved
                )),
            ),
            Err(err) => (None, Some(err.to_string())),
        };
        let consistent = detail.is_none();
        if !consistent {
            warn!(product_id = %product_id, detail = ?detail, "ledger does not match stored balance");
        }

        Ok(Reconciliation {
            product_id,
            inventory_id: inventory.id,
            transaction_count: ledger.len(),
            ledger: replayed,
            actual,
            consistent,
            detail,
        })
    }

    async fn inventory_for(&self, product_id: ProductId) -> ServiceResult<InventoryItem> {
        self.store
            .get_inventory_by_product_id(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory for product", product_id))
    }

    async fn apply_movement(
        &self,
        product_id: ProductId,
        kind: TransactionType,
        request: StockRequest,
    ) -> ServiceResult<StockMovement> {
        validate_movement_quantity(request.quantity)?;
        let item = self.inventory_for(product_id).await?;

        let now = now();
        let notes = request
            .notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| kind.default_note().to_string());
        // Built (and validated) before any write; only its timestamp changes below.
        let mut transaction = Transaction::record(
            item.id,
            product_id,
            kind,
            request.quantity,
            request.reference,
            notes,
            now,
        )?;

        // Phase 1: the guard and the write are one store operation.
        let Some(updated) = self
            .store
            .apply_guarded_delta(item.id, transaction.delta(), now)
            .await?
        else {
            let err = self.rejection(item.id, kind, request.quantity).await;
            warn!(
                product_id = %product_id,
                kind = %kind,
                quantity = request.quantity,
                error = %err,
                "stock movement rejected"
            );
            return Err(err);
        };

        info!(
            product_id = %product_id,
            kind = %kind,
            quantity = request.quantity,
            new_quantity = updated.quantity,
            new_reserved = updated.reserved,
            "stock movement applied"
        );

        // Phase 2: audit entry, stamped with the revision the store assigned so
        // ledger order is apply order.
        transaction.created_at = updated.updated_at;
        self.append_audit(&updated, &transaction).await?;
        Ok(StockMovement {
            inventory: updated,
            transaction,
        })
    }

    /// Explain why a guarded delta affected no rows.
    async fn rejection(&self, inventory_id: InventoryItemId, kind: TransactionType, requested: i64) -> ServiceError {
        let current = match self.store.get_inventory_by_id(inventory_id).await {
            Ok(Some(item)) => item,
            Ok(None) => return ServiceError::not_found("inventory item", inventory_id),
            Err(err) => return err.into(),
        };

        match kind {
            TransactionType::Out | TransactionType::Reserve => ServiceError::InsufficientStock {
                requested,
                available: current.available(),
            },
            TransactionType::Unreserve => ServiceError::InsufficientReservedStock {
                requested,
                reserved: current.reserved,
            },
            TransactionType::In | TransactionType::Return => ServiceError::Validation(format!(
                "adding {requested} units would overflow the stock quantity"
            )),
        }
    }

    async fn append_audit(&self, applied: &InventoryItem, transaction: &Transaction) -> ServiceResult<()> {
        if let Err(err) = self.store.create_transaction(transaction).await {
            error!(
                product_id = %applied.product_id,
                inventory_id = %applied.id,
                transaction_id = %transaction.id,
                kind = %transaction.kind,
                quantity = transaction.quantity,
                error = %err,
                "ledger append failed after stock change was applied"
            );
            return Err(ServiceError::AuditAppendFailed {
                inventory: Box::new(applied.clone()),
                reason: err.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedgerStore;
    use core::str::FromStr;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    type Service = InventoryService<Arc<InMemoryLedgerStore>>;

    fn service() -> Service {
        InventoryService::new(Arc::new(InMemoryLedgerStore::new()))
    }

    fn new_product(sku: &str, initial_quantity: i64) -> NewProduct {
        NewProduct {
            draft: ProductDraft {
                name: "Test Product".into(),
                description: "Test Description".into(),
                sku: sku.into(),
                price: Decimal::from_str("99.99").unwrap(),
            },
            location: "WAREHOUSE-A".into(),
            initial_quantity,
        }
    }

    async fn registered(service: &Service, initial_quantity: i64) -> ProductId {
        service
            .register_product(new_product("TEST-001", initial_quantity))
            .await
            .unwrap()
            .product
            .id
    }

    async fn level(service: &Service, id: ProductId) -> StockLevel {
        service.get_inventory(id).await.unwrap().level()
    }

    async fn transaction_count(service: &Service) -> u64 {
        service.stats().await.unwrap().transactions
    }

    #[tokio::test]
    async fn register_records_initial_stock_entry() {
        let service = service();
        let details = service.register_product(new_product("TEST-001", 50)).await.unwrap();

        assert_eq!(details.inventory.level(), StockLevel::new(50, 0));
        assert_eq!(details.inventory.product_id, details.product.id);

        let history = service
            .list_product_transactions(details.product.id, None, None)
            .await
            .unwrap();
        assert_eq!(history.items.len(), 1);
        let initial = &history.items[0];
        assert_eq!(initial.kind, TransactionType::In);
        assert_eq!(initial.quantity, 50);
        assert_eq!(initial.reference, INITIAL_STOCK_REFERENCE);
        assert_eq!(initial.notes, INITIAL_STOCK_NOTE);
    }

    #[tokio::test]
    async fn register_without_initial_stock_records_nothing() {
        let service = service();
        registered(&service, 0).await;
        assert_eq!(transaction_count(&service).await, 0);
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_before_touching_store() {
        let service = service();
        let mut input = new_product("TEST-001", 5);
        input.draft.name = String::new();
        let err = service.register_product(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .register_product(new_product("TEST-001", -1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        assert_eq!(service.stats().await.unwrap(), LedgerStats { products: 0, transactions: 0 });
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let service = service();
        registered(&service, 1).await;
        let err = service
            .register_product(new_product("TEST-001", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(service.stats().await.unwrap().products, 1);
    }

    #[tokio::test]
    async fn add_stock_increases_quantity() {
        let service = service();
        let id = registered(&service, 50).await;

        let movement = service.add_stock(id, StockRequest::new(20, "PO-001")).await.unwrap();

        assert_eq!(movement.inventory.quantity, 70);
        assert_eq!(movement.transaction.kind, TransactionType::In);
        assert_eq!(movement.transaction.notes, "Stock addition");
        assert_eq!(level(&service, id).await, StockLevel::new(70, 0));
        assert_eq!(transaction_count(&service).await, 2);
    }

    #[tokio::test]
    async fn remove_stock_within_available_succeeds() {
        let service = service();
        let id = registered(&service, 50).await;

        service.remove_stock(id, StockRequest::new(30, "ORDER-001")).await.unwrap();
        assert_eq!(level(&service, id).await, StockLevel::new(20, 0));
    }

    #[tokio::test]
    async fn remove_stock_beyond_available_is_rejected_without_side_effects() {
        let service = service();
        let id = registered(&service, 20).await;
        let before = transaction_count(&service).await;

        let err = service
            .remove_stock(id, StockRequest::new(100, "ORDER-002"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::InsufficientStock {
                requested: 100,
                available: 20
            }
        );
        assert_eq!(level(&service, id).await, StockLevel::new(20, 0));
        assert_eq!(transaction_count(&service).await, before);
    }

    #[tokio::test]
    async fn remove_cannot_consume_reserved_units() {
        let service = service();
        let id = registered(&service, 50).await;
        service.reserve_stock(id, StockRequest::new(20, "HOLD")).await.unwrap();

        let err = service
            .remove_stock(id, StockRequest::new(40, "ORDER"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::InsufficientStock {
                requested: 40,
                available: 30
            }
        );
        assert_eq!(level(&service, id).await, StockLevel::new(50, 20));
    }

    #[tokio::test]
    async fn reserve_reduces_available() {
        let service = service();
        let id = registered(&service, 50).await;

        let movement = service.reserve_stock(id, StockRequest::new(10, "ORDER-003")).await.unwrap();

        assert_eq!(movement.inventory.level(), StockLevel::new(50, 10));
        assert_eq!(movement.inventory.available(), 40);
    }

    #[tokio::test]
    async fn reserve_beyond_available_is_rejected() {
        let service = service();
        let id = registered(&service, 10).await;
        let err = service
            .reserve_stock(id, StockRequest::new(11, "ORDER"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { requested: 11, available: 10 }));
    }

    #[tokio::test]
    async fn unreserve_releases_reservation() {
        let service = service();
        let id = registered(&service, 50).await;
        service.reserve_stock(id, StockRequest::new(10, "ORDER-004")).await.unwrap();

        service.unreserve_stock(id, StockRequest::new(5, "ORDER-004")).await.unwrap();
        assert_eq!(level(&service, id).await, StockLevel::new(50, 5));

        let err = service
            .unreserve_stock(id, StockRequest::new(10, "ORDER-004"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::InsufficientReservedStock {
                requested: 10,
                reserved: 5
            }
        );
        assert_eq!(level(&service, id).await, StockLevel::new(50, 5));
    }

    #[tokio::test]
    async fn return_stock_adds_units_with_return_entry() {
        let service = service();
        let id = registered(&service, 5).await;
        let movement = service.return_stock(id, StockRequest::new(2, "RMA-1")).await.unwrap();
        assert_eq!(movement.inventory.quantity, 7);
        assert_eq!(movement.transaction.kind, TransactionType::Return);
    }

    #[tokio::test]
    async fn caller_notes_override_the_default() {
        let service = service();
        let id = registered(&service, 5).await;
        let request = StockRequest {
            quantity: 1,
            reference: "ORDER".into(),
            notes: Some("damaged box".into()),
        };
        let movement = service.remove_stock(id, request).await.unwrap();
        assert_eq!(movement.transaction.notes, "damaged box");
    }

    #[tokio::test]
    async fn non_positive_quantity_is_a_validation_error() {
        let service = service();
        let id = registered(&service, 5).await;
        for qty in [0, -3] {
            let err = service.add_stock(id, StockRequest::new(qty, "X")).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        assert_eq!(level(&service, id).await, StockLevel::new(5, 0));
        assert_eq!(transaction_count(&service).await, 1);
    }

    #[tokio::test]
    async fn movement_on_unknown_product_is_not_found() {
        let service = service();
        let err = service
            .add_stock(ProductId::new(), StockRequest::new(1, "X"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn add_that_would_overflow_is_rejected() {
        let service = service();
        let id = registered(&service, i64::MAX - 1).await;
        let err = service.add_stock(id, StockRequest::new(2, "X")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(level(&service, id).await, StockLevel::new(i64::MAX - 1, 0));
    }

    #[tokio::test]
    async fn audit_failure_keeps_applied_balance_and_reports_it() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let service = InventoryService::new(store.clone());
        let id = service
            .register_product(new_product("TEST-001", 10))
            .await
            .unwrap()
            .product
            .id;

        store.fail_transaction_appends();
        let err = service.remove_stock(id, StockRequest::new(4, "ORDER")).await.unwrap_err();

        match err {
            ServiceError::AuditAppendFailed { inventory, .. } => {
                assert_eq!(inventory.level(), StockLevel::new(6, 0));
            }
            other => panic!("expected AuditAppendFailed, got {other:?}"),
        }
        assert_eq!(service.get_inventory(id).await.unwrap().quantity, 6);
        assert_eq!(service.stats().await.unwrap().transactions, 1);

        let report = service.reconcile(id).await.unwrap();
        assert!(!report.consistent);
        assert_eq!(report.ledger, Some(StockLevel::new(10, 0)));
        assert_eq!(report.actual, StockLevel::new(6, 0));
    }

    #[tokio::test]
    async fn reconcile_agrees_after_mixed_movements() {
        let service = service();
        let id = registered(&service, 50).await;
        service.add_stock(id, StockRequest::new(20, "PO")).await.unwrap();
        service.reserve_stock(id, StockRequest::new(15, "SO")).await.unwrap();
        service.remove_stock(id, StockRequest::new(30, "SO")).await.unwrap();
        service.unreserve_stock(id, StockRequest::new(5, "SO")).await.unwrap();
        service.return_stock(id, StockRequest::new(3, "RMA")).await.unwrap();
        let _ = service.remove_stock(id, StockRequest::new(500, "SO")).await;

        let report = service.reconcile(id).await.unwrap();
        assert!(report.consistent, "{report:?}");
        assert_eq!(report.actual, StockLevel::new(43, 10));
        assert_eq!(report.transaction_count, 6);
    }

    #[tokio::test]
    async fn update_and_relocate_leave_stock_untouched() {
        let service = service();
        let id = registered(&service, 8).await;
        service.reserve_stock(id, StockRequest::new(3, "SO")).await.unwrap();

        let updated = service
            .update_product(
                id,
                ProductUpdate {
                    price: Some(Decimal::from_str("12.50").unwrap()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Decimal::from_str("12.50").unwrap());

        let moved = service.relocate(id, "WAREHOUSE-B".into()).await.unwrap();
        assert_eq!(moved.location, "WAREHOUSE-B");
        assert_eq!(moved.level(), StockLevel::new(8, 3));

        let err = service.relocate(id, " ".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_inventory_and_ledger() {
        let service = service();
        let id = registered(&service, 8).await;
        let inventory_id = service.get_inventory(id).await.unwrap().id;

        service.delete_product(id).await.unwrap();

        assert!(matches!(service.get_product(id).await, Err(ServiceError::NotFound { .. })));
        assert!(matches!(
            service.get_inventory_by_id(inventory_id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert_eq!(transaction_count(&service).await, 0);
        assert!(matches!(service.delete_product(id).await, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn lookup_by_sku_and_pagination() {
        let service = service();
        for i in 0..15 {
            service
                .register_product(new_product(&format!("SKU-{i:02}"), 1))
                .await
                .unwrap();
        }

        let details = service.get_product_by_sku("SKU-07").await.unwrap();
        assert_eq!(details.product.sku, "SKU-07");
        assert!(matches!(
            service.get_product_by_sku("missing").await,
            Err(ServiceError::NotFound { .. })
        ));

        let first = service.list_products(None, None).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!((first.limit, first.offset), (10, 0));

        let rest = service.list_products(Some(10), Some(10)).await.unwrap();
        assert_eq!(rest.items.len(), 5);

        let clamped = service.list_transactions(Some(10_000), None).await.unwrap();
        assert_eq!(clamped.limit, 100);
        assert_eq!(clamped.items.len(), 15);
    }

    #[tokio::test]
    async fn transactions_are_listed_newest_first() {
        let service = service();
        let id = registered(&service, 10).await;
        let reserve = service.reserve_stock(id, StockRequest::new(1, "A")).await.unwrap();
        let remove = service.remove_stock(id, StockRequest::new(2, "B")).await.unwrap();

        let page = service.list_product_transactions(id, None, None).await.unwrap();
        let kinds: Vec<_> = page.items.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TransactionType::Out, TransactionType::Reserve, TransactionType::In]);

        let fetched = service.get_transaction(remove.transaction.id).await.unwrap();
        assert_eq!(fetched, remove.transaction);

        let by_inventory = service
            .list_inventory_transactions(reserve.inventory.id, Some(1), Some(1))
            .await
            .unwrap();
        assert_eq!(by_inventory.items, vec![reserve.transaction]);
    }

    #[tokio::test]
    async fn overlong_text_is_rejected_before_any_write() {
        use stockledger_inventory::{MAX_LOCATION_LEN, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_REFERENCE_LEN};

        let service = service();
        let id = registered(&service, 50).await;
        let before = service.get_inventory(id).await.unwrap();

        let err = service
            .remove_stock(id, StockRequest::new(20, "R".repeat(MAX_REFERENCE_LEN + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{err:?}");

        let mut request = StockRequest::new(20, "SO-1");
        request.notes = Some("N".repeat(MAX_NOTES_LEN + 1));
        let err = service.reserve_stock(id, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{err:?}");

        assert_eq!(service.get_inventory(id).await.unwrap(), before);
        assert_eq!(transaction_count(&service).await, 1);
        assert!(service.reconcile(id).await.unwrap().consistent);

        let mut input = new_product("TEST-002", 5);
        input.draft.name = "N".repeat(MAX_NAME_LEN + 1);
        let err = service.register_product(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{err:?}");

        let err = service
            .relocate(id, "L".repeat(MAX_LOCATION_LEN + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{err:?}");
        assert_eq!(service.stats().await.unwrap().products, 1);
    }

    #[tokio::test]
    async fn ledger_entries_carry_the_revision_they_applied() {
        use crate::store::TransactionStore;

        let service = service();
        let id = registered(&service, 10).await;

        let mut applied = Vec::new();
        for _ in 0..5 {
            let movement = service.add_stock(id, StockRequest::new(1, "PO")).await.unwrap();
            assert_eq!(movement.transaction.created_at, movement.inventory.updated_at);
            applied.push(movement.transaction);
        }
        assert!(applied.windows(2).all(|w| w[0].created_at < w[1].created_at));

        let ledger = service.store().load_product_ledger(id).await.unwrap();
        assert_eq!(&ledger[1..], applied.as_slice());
        assert!(ledger[0].created_at < ledger[1].created_at);
    }

    #[tokio::test]
    async fn reads_without_mutation_are_identical() {
        let service = service();
        let id = registered(&service, 12).await;
        service.reserve_stock(id, StockRequest::new(4, "SO")).await.unwrap();

        let first = service.get_inventory(id).await.unwrap();
        let second = service.get_inventory(id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.updated_at, second.updated_at);

        let by_id = service.get_inventory_by_id(first.id).await.unwrap();
        assert_eq!(by_id, first);
        assert_eq!(service.get_product(id).await.unwrap(), service.get_product(id).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_removals_have_exactly_one_winner() {
        let service = Arc::new(service());
        let id = registered(&service, 10).await;

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.remove_stock(id, StockRequest::new(8, "A")).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.remove_stock(id, StockRequest::new(8, "B")).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(results.iter().any(|r| matches!(r, Err(ServiceError::InsufficientStock { .. }))));
        assert_eq!(level(&service, id).await, StockLevel::new(2, 0));
        assert_eq!(transaction_count(&service).await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mixed_movements_preserve_invariant_and_ledger() {
        let service = Arc::new(service());
        let id = registered(&service, 100).await;

        let mut handles = Vec::new();
        for i in 0..64i64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let request = StockRequest::new(i % 7 + 1, format!("REQ-{i}"));
                match i % 5 {
                    0 => service.add_stock(id, request).await,
                    1 => service.remove_stock(id, request).await,
                    2 => service.reserve_stock(id, request).await,
                    3 => service.unreserve_stock(id, request).await,
                    _ => service.return_stock(id, request).await,
                }
            }));
        }
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_)
                | Err(ServiceError::InsufficientStock { .. })
                | Err(ServiceError::InsufficientReservedStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        let current = level(&service, id).await;
        assert!(current.is_consistent());
        let report = service.reconcile(id).await.unwrap();
        assert!(report.consistent, "{report:?}");
    }
}
