use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockledger_core::{InventoryItemId, ProductId, TransactionId};
use stockledger_inventory::{InventoryItem, Product, StockDelta, Transaction};

use super::pagination::Pagination;
use super::r#trait::{
    InventoryStore, LedgerStore, ProductStore, StoreError, StoreResult, TransactionStore,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    inventory: HashMap<InventoryItemId, InventoryItem>,
    transactions: Vec<Transaction>,
    /// Ids present in `transactions`, for O(1) duplicate checks on append.
    transaction_ids: HashSet<TransactionId>,
}

impl State {
    fn sku_taken(&self, sku: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.sku == sku && Some(p.id) != except)
    }

    fn check_new_product(&self, product: &Product) -> StoreResult<()> {
        if self.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        if self.sku_taken(&product.sku, None) {
            return Err(StoreError::Conflict(format!(
                "SKU '{}' already exists",
                product.sku
            )));
        }
        Ok(())
    }

    fn check_new_item(&self, item: &InventoryItem) -> StoreResult<()> {
        if self.inventory.contains_key(&item.id) {
            return Err(StoreError::Conflict(format!(
                "inventory item {} already exists",
                item.id
            )));
        }
        if self.inventory.values().any(|i| i.product_id == item.product_id) {
            return Err(StoreError::Conflict(format!(
                "product {} already has an inventory item",
                item.product_id
            )));
        }
        Ok(())
    }

    fn remove_inventory_cascade(&mut self, id: InventoryItemId) {
        self.inventory.remove(&id);
        self.retain_transactions(|t| t.inventory_id != id);
    }

    fn retain_transactions(&mut self, keep: impl Fn(&Transaction) -> bool) {
        let ids = &mut self.transaction_ids;
        self.transactions.retain(|t| {
            let kept = keep(t);
            if !kept {
                ids.remove(&t.id);
            }
            kept
        });
    }
}

/// Sort newest first, with the id as a tie-breaker for equal timestamps.
fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, K)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Not optimized for performance. Every write runs
/// under the single state lock, which makes guarded deltas and registration
/// atomic.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
    #[cfg(test)]
    fail_appends: std::sync::atomic::AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent transaction append fail as if the store went away.
    #[cfg(test)]
    pub(crate) fn fail_transaction_appends(&self) {
        self.fail_appends
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn transactions_where(
        &self,
        page: Pagination,
        pred: impl Fn(&Transaction) -> bool,
    ) -> StoreResult<Vec<Transaction>> {
        let mut matching: Vec<Transaction> = self
            .read()?
            .transactions
            .iter()
            .filter(|t| pred(*t))
            .cloned()
            .collect();
        newest_first(&mut matching, |t| (t.created_at, t.id));
        Ok(page.window(matching))
    }
}

#[async_trait]
impl ProductStore for InMemoryLedgerStore {
    async fn create_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.write()?;
        state.check_new_product(product)?;
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .read()?
            .products
            .values()
            .find(|p| p.sku == sku)
            .cloned())
    }

    async fn list_products(&self, page: Pagination) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.read()?.products.values().cloned().collect();
        newest_first(&mut products, |p| (p.created_at, p.id));
        Ok(page.window(products))
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(&product.id) {
            return Err(StoreError::not_found("product", product.id));
        }
        if state.sku_taken(&product.sku, Some(product.id)) {
            return Err(StoreError::Conflict(format!(
                "SKU '{}' already exists",
                product.sku
            )));
        }
        if let Some(existing) = state.products.get_mut(&product.id) {
            existing.name = product.name.clone();
            existing.description = product.description.clone();
            existing.sku = product.sku.clone();
            existing.price = product.price;
            existing.updated_at = product.updated_at;
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.products.remove(&id).is_none() {
            return Err(StoreError::not_found("product", id));
        }
        state.inventory.retain(|_, item| item.product_id != id);
        state.retain_transactions(|t| t.product_id != id);
        Ok(())
    }

    async fn count_products(&self) -> StoreResult<u64> {
        Ok(self.read()?.products.len() as u64)
    }
}

#[async_trait]
impl InventoryStore for InMemoryLedgerStore {
    async fn create_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(&item.product_id) {
            return Err(StoreError::Constraint(format!(
                "product {} does not exist",
                item.product_id
            )));
        }
        state.check_new_item(item)?;
        state.inventory.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_inventory_by_id(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        Ok(self.read()?.inventory.get(&id).cloned())
    }

    async fn get_inventory_by_product_id(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Option<InventoryItem>> {
        Ok(self
            .read()?
            .inventory
            .values()
            .find(|i| i.product_id == product_id)
            .cloned())
    }

    async fn list_inventory(&self, page: Pagination) -> StoreResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self.read()?.inventory.values().cloned().collect();
        newest_first(&mut items, |i| (i.created_at, i.id));
        Ok(page.window(items))
    }

    async fn update_inventory_fields(&self, item: &InventoryItem) -> StoreResult<()> {
        let mut state = self.write()?;
        let existing = state
            .inventory
            .get_mut(&item.id)
            .ok_or_else(|| StoreError::not_found("inventory item", item.id))?;
        existing.location = item.location.clone();
        existing.updated_at = existing.updated_at.max(item.updated_at);
        Ok(())
    }

    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.inventory.contains_key(&id) {
            return Err(StoreError::not_found("inventory item", id));
        }
        state.remove_inventory_cascade(id);
        Ok(())
    }

    async fn apply_guarded_delta(
        &self,
        id: InventoryItemId,
        delta: StockDelta,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<InventoryItem>> {
        let mut state = self.write()?;
        let Some(item) = state.inventory.get_mut(&id) else {
            return Ok(None);
        };
        Ok(item.try_apply(delta, now).then(|| item.clone()))
    }
}

#[async_trait]
impl TransactionStore for InMemoryLedgerStore {
    async fn create_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        #[cfg(test)]
        if self.fail_appends.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("transaction appends disabled".to_string()));
        }

        let mut state = self.write()?;
        let item = state.inventory.get(&transaction.inventory_id).ok_or_else(|| {
            StoreError::Constraint(format!(
                "inventory item {} does not exist",
                transaction.inventory_id
            ))
        })?;
        if item.product_id != transaction.product_id
            || !state.products.contains_key(&transaction.product_id)
        {
            return Err(StoreError::Constraint(format!(
                "product {} does not own inventory item {}",
                transaction.product_id, transaction.inventory_id
            )));
        }
        if transaction.quantity <= 0 {
            return Err(StoreError::Constraint(
                "transaction quantity must be positive".to_string(),
            ));
        }
        if state.transaction_ids.contains(&transaction.id) {
            return Err(StoreError::Conflict(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        state.transaction_ids.insert(transaction.id);
        state.transactions.push(transaction.clone());
        Ok(())
    }

    async fn get_transaction_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn list_transactions_by_inventory(
        &self,
        inventory_id: InventoryItemId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>> {
        self.transactions_where(page, |t| t.inventory_id == inventory_id)
    }

    async fn list_transactions_by_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>> {
        self.transactions_where(page, |t| t.product_id == product_id)
    }

    async fn list_transactions(&self, page: Pagination) -> StoreResult<Vec<Transaction>> {
        self.transactions_where(page, |_| true)
    }

    /// Oldest first by `(created_at, id)`, the same order Postgres uses.
    async fn load_product_ledger(&self, product_id: ProductId) -> StoreResult<Vec<Transaction>> {
        let mut ledger: Vec<Transaction> = self
            .read()?
            .transactions
            .iter()
            .filter(|t| t.product_id == product_id)
            .cloned()
            .collect();
        ledger.sort_by_key(|t| (t.created_at, t.id));
        Ok(ledger)
    }

    async fn count_transactions(&self) -> StoreResult<u64> {
        Ok(self.read()?.transactions.len() as u64)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn register_product(&self, product: &Product, item: &InventoryItem) -> StoreResult<()> {
        if item.product_id != product.id {
            return Err(StoreError::Constraint(format!(
                "inventory item {} does not belong to product {}",
                item.id, product.id
            )));
        }

        let mut state = self.write()?;
        state.check_new_product(product)?;
        state.check_new_item(item)?;
        state.products.insert(product.id, product.clone());
        state.inventory.insert(item.id, item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use rust_decimal::Decimal;
    use stockledger_inventory::{ProductDraft, StockLevel, TransactionType};

    fn product(sku: &str) -> Product {
        Product::new(
            ProductDraft {
                name: "Widget".into(),
                description: String::new(),
                sku: sku.into(),
                price: Decimal::from_str("9.99").unwrap(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    async fn registered(store: &InMemoryLedgerStore, sku: &str, qty: i64) -> (Product, InventoryItem) {
        let p = product(sku);
        let item = InventoryItem::new(p.id, qty, "WAREHOUSE-A", Utc::now()).unwrap();
        store.register_product(&p, &item).await.unwrap();
        (p, item)
    }

    fn tx(item: &InventoryItem, kind: TransactionType, qty: i64) -> Transaction {
        Transaction::record(item.id, item.product_id, kind, qty, "REF", "", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn register_rejects_duplicate_sku_without_partial_write() {
        let store = InMemoryLedgerStore::new();
        registered(&store, "SKU-1", 5).await;

        let dup = product("SKU-1");
        let item = InventoryItem::new(dup.id, 1, "WAREHOUSE-B", Utc::now()).unwrap();
        let err = store.register_product(&dup, &item).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_product_by_id(dup.id).await.unwrap().is_none());
        assert!(store.get_inventory_by_id(item.id).await.unwrap().is_none());
        assert_eq!(store.count_products().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn guarded_delta_applies_or_leaves_item_untouched() {
        let store = InMemoryLedgerStore::new();
        let (_, item) = registered(&store, "SKU-1", 10).await;

        let applied = store
            .apply_guarded_delta(item.id, StockDelta::new(0, 4), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.level(), StockLevel::new(10, 4));

        let rejected = store
            .apply_guarded_delta(item.id, StockDelta::new(-7, 0), Utc::now())
            .await
            .unwrap();
        assert!(rejected.is_none());

        let current = store.get_inventory_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(current.level(), StockLevel::new(10, 4));
    }

    #[tokio::test]
    async fn guarded_delta_on_missing_item_affects_nothing() {
        let store = InMemoryLedgerStore::new();
        let result = store
            .apply_guarded_delta(InventoryItemId::new(), StockDelta::new(1, 0), Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn transactions_list_newest_first_and_ledger_oldest_first() {
        let store = InMemoryLedgerStore::new();
        let (p, item) = registered(&store, "SKU-1", 10).await;
        let first = tx(&item, TransactionType::In, 1);
        let mut second = tx(&item, TransactionType::Out, 2);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        // Appended out of order: listings follow created_at, not append order.
        store.create_transaction(&second).await.unwrap();
        store.create_transaction(&first).await.unwrap();

        let listed = store
            .list_transactions_by_product(p.id, Pagination::new(10, 0))
            .await
            .unwrap();
        assert_eq!(listed, vec![second.clone(), first.clone()]);

        let ledger = store.load_product_ledger(p.id).await.unwrap();
        assert_eq!(ledger, vec![first, second]);
    }

    #[tokio::test]
    async fn duplicate_transaction_id_is_a_conflict_until_cascaded_away() {
        let store = InMemoryLedgerStore::new();
        let (p, item) = registered(&store, "SKU-1", 10).await;
        let entry = tx(&item, TransactionType::In, 1);
        store.create_transaction(&entry).await.unwrap();

        let err = store.create_transaction(&entry).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_transactions().await.unwrap(), 1);

        store.delete_product(p.id).await.unwrap();
        let (_, item) = registered(&store, "SKU-1", 10).await;
        let reused = Transaction {
            inventory_id: item.id,
            product_id: item.product_id,
            ..entry
        };
        store.create_transaction(&reused).await.unwrap();
    }

    #[tokio::test]
    async fn guarded_deltas_stamp_strictly_increasing_revisions() {
        let store = InMemoryLedgerStore::new();
        let (_, item) = registered(&store, "SKU-1", 10).await;
        let stale = item.updated_at - chrono::Duration::seconds(10);

        let first = store
            .apply_guarded_delta(item.id, StockDelta::new(1, 0), stale)
            .await
            .unwrap()
            .unwrap();
        let second = store
            .apply_guarded_delta(item.id, StockDelta::new(1, 0), stale)
            .await
            .unwrap()
            .unwrap();
        assert!(first.updated_at > item.updated_at);
        assert!(second.updated_at > first.updated_at);

        let mut relocated = second.clone();
        relocated.location = "WAREHOUSE-B".into();
        relocated.updated_at = stale;
        store.update_inventory_fields(&relocated).await.unwrap();
        let stored = store.get_inventory_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn create_transaction_requires_existing_item() {
        let store = InMemoryLedgerStore::new();
        let p = product("SKU-1");
        let orphan = InventoryItem::new(p.id, 1, "WAREHOUSE-A", Utc::now()).unwrap();
        let err = store
            .create_transaction(&tx(&orphan, TransactionType::In, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn delete_product_cascades() {
        let store = InMemoryLedgerStore::new();
        let (p, item) = registered(&store, "SKU-1", 10).await;
        let (_, other) = registered(&store, "SKU-2", 3).await;
        store.create_transaction(&tx(&item, TransactionType::In, 1)).await.unwrap();
        store.create_transaction(&tx(&other, TransactionType::In, 1)).await.unwrap();

        store.delete_product(p.id).await.unwrap();

        assert!(store.get_inventory_by_id(item.id).await.unwrap().is_none());
        assert_eq!(store.count_transactions().await.unwrap(), 1);
        assert_eq!(store.count_products().await.unwrap(), 1);

        let err = store.delete_product(p.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_product_rejects_sku_of_another_product() {
        let store = InMemoryLedgerStore::new();
        let (mut a, _) = registered(&store, "SKU-A", 1).await;
        registered(&store, "SKU-B", 1).await;

        a.sku = "SKU-B".into();
        let err = store.update_product(&a).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        a.sku = "SKU-A".into();
        a.name = "Renamed".into();
        store.update_product(&a).await.unwrap();
        let stored = store.get_product_by_sku("SKU-A").await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
    }

    #[tokio::test]
    async fn update_inventory_fields_ignores_stock_columns() {
        let store = InMemoryLedgerStore::new();
        let (_, mut item) = registered(&store, "SKU-1", 10).await;
        item.location = "WAREHOUSE-B".into();
        item.quantity = 999;
        store.update_inventory_fields(&item).await.unwrap();

        let stored = store.get_inventory_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.location, "WAREHOUSE-B");
        assert_eq!(stored.quantity, 10);
    }
}
