//! Postgres-backed ledger store.
//!
//! ## Guarded updates
//!
//! Stock deltas are applied with a single conditional statement:
//!
//! ```sql
//! UPDATE inventory
//! SET quantity = quantity + $1, reserved = reserved + $2,
//!     updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond')
//! WHERE id = $4
//!   AND quantity + $1 >= 0 AND reserved + $2 >= 0
//!   AND quantity + $1 >= reserved + $2
//! RETURNING ...
//! ```
//!
//! The row lock taken by `UPDATE` serializes concurrent deltas on the same item, and
//! each one re-evaluates the guard against the committed row. No row returned means
//! the guard failed or the item is gone.
//!
//! `updated_at` strictly increases per item in lock order. The service stamps
//! each ledger entry with the returned value, so ordering a product's ledger by
//! `created_at` reproduces the order its deltas were applied in.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (numeric out of range) | `22003` | `Constraint` |
//! | Database (string too long) | `22001` | `Constraint` |
//! | Database (not null violation) | `23502` | `Constraint` |
//! | Database (other) | any other | `Unavailable` |
//! | PoolClosed / PoolTimedOut / Io / Tls / other | N/A | `Unavailable` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgExecutor, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use stockledger_inventory::{
    MAX_LOCATION_LEN, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_REFERENCE_LEN, MAX_SKU_LEN,
};

use stockledger_core::{DomainError, InventoryItemId, ProductId, TransactionId};
use stockledger_inventory::{InventoryItem, Product, StockDelta, Transaction, TransactionType};

use super::pagination::Pagination;
use super::r#trait::{
    InventoryStore, LedgerStore, ProductStore, StoreError, StoreResult, TransactionStore,
};

/// Idempotent schema. CHECK constraints mirror the domain invariants and the
/// VARCHAR widths come from the domain text limits.
fn schema() -> Vec<String> {
    vec![
        format!(
            r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        name        VARCHAR({MAX_NAME_LEN}) NOT NULL CHECK (length(trim(name)) > 0),
        description TEXT NOT NULL DEFAULT '',
        sku         VARCHAR({MAX_SKU_LEN}) NOT NULL UNIQUE CHECK (length(trim(sku)) > 0),
        price       NUMERIC(10, 2) NOT NULL CHECK (price >= 0),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#
        ),
        format!(
            r#"
    CREATE TABLE IF NOT EXISTS inventory (
        id          UUID PRIMARY KEY,
        product_id  UUID NOT NULL UNIQUE REFERENCES products(id) ON DELETE CASCADE,
        quantity    BIGINT NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        reserved    BIGINT NOT NULL DEFAULT 0 CHECK (reserved >= 0),
        location    VARCHAR({MAX_LOCATION_LEN}) NOT NULL CHECK (length(trim(location)) > 0),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT inventory_reserved_within_quantity CHECK (reserved <= quantity)
    )
    "#
        ),
        format!(
            r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id           UUID PRIMARY KEY,
        inventory_id UUID NOT NULL REFERENCES inventory(id) ON DELETE CASCADE,
        product_id   UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        type         VARCHAR(20) NOT NULL
                     CHECK (type IN ('IN', 'OUT', 'RESERVE', 'UNRESERVE', 'RETURN')),
        quantity     BIGINT NOT NULL CHECK (quantity > 0),
        reference    VARCHAR({MAX_REFERENCE_LEN}) NOT NULL DEFAULT '',
        notes        VARCHAR({MAX_NOTES_LEN}) NOT NULL DEFAULT '',
        created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#
        ),
        "CREATE INDEX IF NOT EXISTS idx_products_sku ON products(sku)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_inventory_product_id ON inventory(product_id)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_transactions_inventory_id ON transactions(inventory_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_transactions_product_id ON transactions(product_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at DESC)"
            .to_string(),
    ]
}

const PRODUCT_COLUMNS: &str = "id, name, description, sku, price, created_at, updated_at";
const INVENTORY_COLUMNS: &str =
    "id, product_id, quantity, reserved, location, created_at, updated_at";
const TRANSACTION_COLUMNS: &str =
    "id, inventory_id, product_id, type, quantity, reference, notes, created_at";

/// Postgres-backed ledger store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool of at most `max_connections` connections.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn init_schema(&self) -> StoreResult<()> {
        for statement in schema() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("init_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresLedgerStore {
    #[instrument(skip(self, product), fields(product_id = %product.id, sku = %product.sku), err)]
    async fn create_product(&self, product: &Product) -> StoreResult<()> {
        insert_product(&self.pool, product).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product_by_id", e))?;
        row.map(|r| decode_row("get_product_by_id", &r, product_from_row))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product_by_sku", e))?;
        row.map(|r| decode_row("get_product_by_sku", &r, product_from_row))
            .transpose()
    }

    #[instrument(skip(self), fields(limit = page.limit, offset = page.offset, row_count), err)]
    async fn list_products(&self, page: Pagination) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        let products = decode_rows("list_products", &rows, product_from_row)?;
        Span::current().record("row_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $1, description = $2, sku = $3, price = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(product.price)
        .bind(product.updated_at)
        .bind(*product.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", product.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count_products(&self) -> StoreResult<u64> {
        count(&self.pool, "count_products", "SELECT COUNT(*) FROM products").await
    }
}

#[async_trait]
impl InventoryStore for PostgresLedgerStore {
    #[instrument(skip(self, item), fields(inventory_id = %item.id, product_id = %item.product_id), err)]
    async fn create_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        insert_inventory_item(&self.pool, item).await
    }

    #[instrument(skip(self), fields(inventory_id = %id), err)]
    async fn get_inventory_by_id(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query(&format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_inventory_by_id", e))?;
        row.map(|r| decode_row("get_inventory_by_id", &r, inventory_from_row))
            .transpose()
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn get_inventory_by_product_id(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_id = $1"
        ))
        .bind(*product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory_by_product_id", e))?;
        row.map(|r| decode_row("get_inventory_by_product_id", &r, inventory_from_row))
            .transpose()
    }

    #[instrument(skip(self), fields(limit = page.limit, offset = page.offset), err)]
    async fn list_inventory(&self, page: Pagination) -> StoreResult<Vec<InventoryItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory", e))?;
        decode_rows("list_inventory", &rows, inventory_from_row)
    }

    #[instrument(skip(self, item), fields(inventory_id = %item.id), err)]
    async fn update_inventory_fields(&self, item: &InventoryItem) -> StoreResult<()> {
        let result = sqlx::query("UPDATE inventory SET location = $1, updated_at = GREATEST($2, updated_at) WHERE id = $3")
            .bind(&item.location)
            .bind(item.updated_at)
            .bind(*item.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_inventory_fields", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("inventory item", item.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(inventory_id = %id), err)]
    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_inventory_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("inventory item", id));
        }
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(inventory_id = %id, dq = delta.quantity, dr = delta.reserved, applied),
        err
    )]
    async fn apply_guarded_delta(
        &self,
        id: InventoryItemId,
        delta: StockDelta,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE inventory
            SET quantity = quantity + $1,
                reserved = reserved + $2,
                updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond')
            WHERE id = $4
              AND quantity + $1 >= 0
              AND reserved + $2 >= 0
              AND quantity + $1 >= reserved + $2
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(delta.quantity)
        .bind(delta.reserved)
        .bind(now)
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("apply_guarded_delta", e))?;

        Span::current().record("applied", row.is_some());
        row.map(|r| decode_row("apply_guarded_delta", &r, inventory_from_row))
            .transpose()
    }
}

#[async_trait]
impl TransactionStore for PostgresLedgerStore {
    #[instrument(
        skip(self, transaction),
        fields(transaction_id = %transaction.id, kind = %transaction.kind, quantity = transaction.quantity),
        err
    )]
    async fn create_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(*transaction.id.as_uuid())
        .bind(*transaction.inventory_id.as_uuid())
        .bind(*transaction.product_id.as_uuid())
        .bind(transaction.kind.as_str())
        .bind(transaction.quantity)
        .bind(&transaction.reference)
        .bind(&transaction.notes)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(transaction_id = %id), err)]
    async fn get_transaction_by_id(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_transaction_by_id", e))?;
        row.map(|r| decode_row("get_transaction_by_id", &r, transaction_from_row))
            .transpose()
    }

    #[instrument(skip(self), fields(inventory_id = %inventory_id), err)]
    async fn list_transactions_by_inventory(
        &self,
        inventory_id: InventoryItemId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE inventory_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(*inventory_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions_by_inventory", e))?;
        decode_rows("list_transactions_by_inventory", &rows, transaction_from_row)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn list_transactions_by_product(
        &self,
        product_id: ProductId,
        page: Pagination,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(*product_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions_by_product", e))?;
        decode_rows("list_transactions_by_product", &rows, transaction_from_row)
    }

    #[instrument(skip(self), err)]
    async fn list_transactions(&self, page: Pagination) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;
        decode_rows("list_transactions", &rows, transaction_from_row)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn load_product_ledger(&self, product_id: ProductId) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE product_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(*product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_product_ledger", e))?;
        decode_rows("load_product_ledger", &rows, transaction_from_row)
    }

    #[instrument(skip(self), err)]
    async fn count_transactions(&self) -> StoreResult<u64> {
        count(&self.pool, "count_transactions", "SELECT COUNT(*) FROM transactions").await
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    /// Inserts both rows in one database transaction.
    #[instrument(skip(self, product, item), fields(product_id = %product.id, sku = %product.sku), err)]
    async fn register_product(&self, product: &Product, item: &InventoryItem) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        insert_product(&mut *tx, product).await?;
        insert_inventory_item(&mut *tx, item).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }
}

async fn insert_product<'e, E>(executor: E, product: &Product) -> StoreResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(&format!(
        "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
    ))
    .bind(*product.id.as_uuid())
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.sku)
    .bind(product.price)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_product", e))?;
    Ok(())
}

async fn insert_inventory_item<'e, E>(executor: E, item: &InventoryItem) -> StoreResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(&format!(
        "INSERT INTO inventory ({INVENTORY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
    ))
    .bind(*item.id.as_uuid())
    .bind(*item.product_id.as_uuid())
    .bind(item.quantity)
    .bind(item.reserved)
    .bind(&item.location)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_inventory_item", e))?;
    Ok(())
}

async fn count(pool: &PgPool, operation: &str, sql: &str) -> StoreResult<u64> {
    let n: i64 = sqlx::query_scalar(sql)
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(n.max(0) as u64)
}

/// Map SQLx errors to `StoreError` (see module docs for the table).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") | Some("23514") | Some("23502") | Some("22003") | Some("22001") => {
                    StoreError::Constraint(msg)
                }
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_row<T>(
    operation: &str,
    row: &PgRow,
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> StoreResult<T> {
    decode(row).map_err(|e| {
        StoreError::Unavailable(format!("failed to decode row in {}: {}", operation, e))
    })
}

fn decode_rows<T>(
    operation: &str,
    rows: &[PgRow],
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> StoreResult<Vec<T>> {
    rows.iter().map(|r| decode_row(operation, r, decode)).collect()
}

// SQLx row decoding

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let price: Decimal = row.try_get("price")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        sku: row.try_get("sku")?,
        price,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn inventory_from_row(row: &PgRow) -> Result<InventoryItem, sqlx::Error> {
    Ok(InventoryItem {
        id: InventoryItemId::from_uuid(row.try_get("id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        reserved: row.try_get("reserved")?,
        location: row.try_get("location")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, sqlx::Error> {
    let kind: String = row.try_get("type")?;
    let kind: TransactionType = kind
        .parse()
        .map_err(|e: DomainError| sqlx::Error::Decode(Box::new(e)))?;
    Ok(Transaction {
        id: TransactionId::from_uuid(row.try_get("id")?),
        inventory_id: InventoryItemId::from_uuid(row.try_get("inventory_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        kind,
        quantity: row.try_get("quantity")?,
        reference: row.try_get("reference")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}
