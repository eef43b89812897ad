use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, ProductId};

use crate::limits::{MAX_NAME_LEN, MAX_SKU_LEN, check_len};

/// Number of fractional digits a price may carry.
pub const PRICE_SCALE: u32 = 2;

/// Largest storable price (`NUMERIC(10, 2)`).
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, PRICE_SCALE);

/// A sellable product. Owns exactly one inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sku: String,
    pub price: Decimal,
}

/// Partial edit of a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
}

impl Product {
    /// Build a validated product with a fresh identifier.
    pub fn new(draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut product = Self {
            id: ProductId::new(),
            name: draft.name,
            description: draft.description,
            sku: draft.sku,
            price: draft.price,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        product.price = canonical_price(product.price);
        Ok(product)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("product SKU cannot be empty"));
        }
        check_len("product name", &self.name, MAX_NAME_LEN)?;
        check_len("product SKU", &self.sku, MAX_SKU_LEN)?;
        validate_price(self.price)
    }

    /// Apply an edit, returning the updated product without touching `self`
    /// when the result would be invalid.
    pub fn with_update(&self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name;
        }
        if let Some(description) = update.description {
            next.description = description;
        }
        if let Some(sku) = update.sku {
            next.sku = sku;
        }
        if let Some(price) = update.price {
            next.price = price;
        }
        next.validate()?;
        next.price = canonical_price(next.price);
        next.updated_at = now;
        Ok(next)
    }
}

/// Validated prices always carry exactly `PRICE_SCALE` fractional digits, the
/// same representation `NUMERIC(10, 2)` returns.
fn canonical_price(price: Decimal) -> Decimal {
    let mut price = price.round_dp(PRICE_SCALE);
    price.rescale(PRICE_SCALE);
    price
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("product price cannot be negative"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(DomainError::validation(format!(
            "product price cannot have more than {PRICE_SCALE} decimal places"
        )));
    }
    if price > MAX_PRICE {
        return Err(DomainError::validation(format!(
            "product price cannot exceed {MAX_PRICE}"
        )));
    }
    Ok(())
}
