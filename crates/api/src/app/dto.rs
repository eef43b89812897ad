//! Request bodies and response shapes.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use stockledger_infra::{Page, ProductDetails, Reconciliation, StockMovement};
use stockledger_inventory::{InventoryItem, Product, ProductUpdate, Transaction};

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(value: UpdateProductRequest) -> Self {
        ProductUpdate {
            name: value.name,
            description: value.description,
            sku: value.sku,
            price: value.price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelocateRequest {
    pub location: String,
}

/// `?limit=&offset=`; values that are not integers are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    pub fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|v| v.trim().parse().ok())
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "description": p.description,
        "sku": p.sku,
        "price": p.price,
        "created_at": p.created_at,
        "updated_at": p.updated_at,
    })
}

/// Inventory item with its derived `available` count.
pub fn inventory_to_json(i: &InventoryItem) -> Value {
    json!({
        "id": i.id,
        "product_id": i.product_id,
        "quantity": i.quantity,
        "reserved": i.reserved,
        "available": i.available(),
        "location": i.location,
        "created_at": i.created_at,
        "updated_at": i.updated_at,
    })
}

pub fn transaction_to_json(t: &Transaction) -> Value {
    json!({
        "id": t.id,
        "inventory_id": t.inventory_id,
        "product_id": t.product_id,
        "type": t.kind,
        "quantity": t.quantity,
        "reference": t.reference,
        "notes": t.notes,
        "created_at": t.created_at,
    })
}

pub fn details_to_json(d: &ProductDetails) -> Value {
    json!({
        "product": product_to_json(&d.product),
        "inventory": inventory_to_json(&d.inventory),
    })
}

pub fn movement_to_json(m: &StockMovement) -> Value {
    json!({
        "inventory": inventory_to_json(&m.inventory),
        "transaction": transaction_to_json(&m.transaction),
    })
}

pub fn reconciliation_to_json(r: &Reconciliation) -> Value {
    let mut body = json!({
        "product_id": r.product_id,
        "inventory_id": r.inventory_id,
        "transaction_count": r.transaction_count,
        "ledger": r.ledger,
        "actual": r.actual,
        "consistent": r.consistent,
    });
    if let (Some(detail), Some(obj)) = (&r.detail, body.as_object_mut()) {
        obj.insert("detail".into(), Value::from(detail.clone()));
    }
    body
}

pub fn page_to_json<T>(page: &Page<T>, item: impl Fn(&T) -> Value) -> Value {
    json!({
        "items": page.items.iter().map(item).collect::<Vec<_>>(),
        "limit": page.limit,
        "offset": page.offset,
        "count": page.items.len(),
    })
}
