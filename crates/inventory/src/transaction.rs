use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, InventoryItemId, ProductId, TransactionId};

use crate::item::StockDelta;
use crate::limits::{MAX_NOTES_LEN, MAX_REFERENCE_LEN, check_len};

/// Reference recorded on the transaction created at product registration.
pub const INITIAL_STOCK_REFERENCE: &str = "INITIAL_STOCK";

/// Kind of ledger event (closed set).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
    Reserve,
    Unreserve,
    Return,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::In,
        TransactionType::Out,
        TransactionType::Reserve,
        TransactionType::Unreserve,
        TransactionType::Return,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::Reserve => "RESERVE",
            TransactionType::Unreserve => "UNRESERVE",
            TransactionType::Return => "RETURN",
        }
    }

    /// Stock change a movement of `quantity` units of this kind applies.
    pub fn delta(&self, quantity: i64) -> StockDelta {
        match self {
            TransactionType::In | TransactionType::Return => StockDelta::new(quantity, 0),
            TransactionType::Out => StockDelta::new(-quantity, 0),
            TransactionType::Reserve => StockDelta::new(0, quantity),
            TransactionType::Unreserve => StockDelta::new(0, -quantity),
        }
    }

    /// Note recorded when the caller supplies none.
    pub fn default_note(&self) -> &'static str {
        match self {
            TransactionType::In => "Stock addition",
            TransactionType::Out => "Stock removal",
            TransactionType::Reserve => "Stock reservation",
            TransactionType::Unreserve => "Stock unreservation",
            TransactionType::Return => "Stock return",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("invalid transaction type: {s}")))
    }
}

/// Immutable ledger entry describing one applied stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub inventory_id: InventoryItemId,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    pub reference: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a validated ledger entry with a fresh identifier.
    pub fn record(
        inventory_id: InventoryItemId,
        product_id: ProductId,
        kind: TransactionType,
        quantity: i64,
        reference: impl Into<String>,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let transaction = Self {
            id: TransactionId::new(),
            inventory_id,
            product_id,
            kind,
            quantity,
            reference: reference.into(),
            notes: notes.into(),
            created_at: now,
        };
        transaction.validate()?;
        Ok(transaction)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_movement_quantity(self.quantity)?;
        check_len("reference", &self.reference, MAX_REFERENCE_LEN)?;
        check_len("notes", &self.notes, MAX_NOTES_LEN)
    }

    pub fn delta(&self) -> StockDelta {
        self.kind.delta(self.quantity)
    }
}

/// Movements are always strictly positive; direction comes from the type.
pub fn validate_movement_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
