use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, InventoryItemId, ProductId};

use crate::limits::{MAX_LOCATION_LEN, check_len};

/// On-hand and reserved units of one inventory item.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i64,
    pub reserved: i64,
}

impl StockLevel {
    pub fn new(quantity: i64, reserved: i64) -> Self {
        Self { quantity, reserved }
    }

    /// Units that can still be removed or reserved: `quantity - reserved`, floored at zero.
    pub fn available(&self) -> i64 {
        self.quantity.saturating_sub(self.reserved).max(0)
    }

    /// `0 <= reserved <= quantity`.
    pub fn is_consistent(&self) -> bool {
        self.quantity >= 0 && self.reserved >= 0 && self.reserved <= self.quantity
    }
}

/// Signed change to a [`StockLevel`].
///
/// Every stock movement is one of these; the guard in [`StockDelta::apply_to`]
/// is the single rule deciding whether a movement may take effect.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockDelta {
    pub quantity: i64,
    pub reserved: i64,
}

impl StockDelta {
    pub fn new(quantity: i64, reserved: i64) -> Self {
        Self { quantity, reserved }
    }

    /// Resulting level if the guard holds, `None` otherwise.
    ///
    /// Guard: `quantity + dq >= 0`, `reserved + dr >= 0` and
    /// `quantity + dq >= reserved + dr`. Arithmetic overflow is a rejection.
    pub fn apply_to(&self, level: StockLevel) -> Option<StockLevel> {
        let quantity = level.quantity.checked_add(self.quantity)?;
        let reserved = level.reserved.checked_add(self.reserved)?;
        let next = StockLevel { quantity, reserved };
        next.is_consistent().then_some(next)
    }
}

/// Stock record of a product (1:1 with [`crate::Product`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub reserved: i64,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// New stock record holding `initial_quantity` units and no reservations.
    pub fn new(
        product_id: ProductId,
        initial_quantity: i64,
        location: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let item = Self {
            id: InventoryItemId::new(),
            product_id,
            quantity: initial_quantity,
            reserved: 0,
            location: location.into(),
            created_at: now,
            updated_at: now,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn level(&self) -> StockLevel {
        StockLevel::new(self.quantity, self.reserved)
    }

    pub fn available(&self) -> i64 {
        self.level().available()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if self.reserved < 0 {
            return Err(DomainError::validation("reserved quantity cannot be negative"));
        }
        if self.reserved > self.quantity {
            return Err(DomainError::invariant(
                "reserved quantity cannot exceed total quantity",
            ));
        }
        validate_location(&self.location)
    }

    /// Apply `delta` in place if its guard holds. Returns whether it was applied;
    /// a rejected delta leaves the item untouched.
    pub fn try_apply(&mut self, delta: StockDelta, now: DateTime<Utc>) -> bool {
        match delta.apply_to(self.level()) {
            Some(next) => {
                self.quantity = next.quantity;
                self.reserved = next.reserved;
                self.updated_at = next_revision_at(self.updated_at, now);
                true
            }
            None => false,
        }
    }
}

pub fn validate_location(location: &str) -> DomainResult<()> {
    if location.trim().is_empty() {
        return Err(DomainError::validation("location cannot be empty"));
    }
    check_len("location", location, MAX_LOCATION_LEN)
}

/// Timestamp of the next stock revision: `now`, but at least one microsecond
/// after `previous`. Revisions of one item are therefore strictly ordered, and
/// ledger entries stamped with them sort in the order they were applied.
pub fn next_revision_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous + TimeDelta::microseconds(1))
}
