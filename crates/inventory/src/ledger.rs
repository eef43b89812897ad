//! Ledger replay: rebuilding stock levels from transaction history.

use stockledger_core::{DomainError, DomainResult};

use crate::item::StockLevel;
use crate::transaction::Transaction;

/// Apply `transactions` in order, starting from an empty level.
///
/// Every prefix must describe a reachable level (`0 <= reserved <= quantity`),
/// exactly as the guard enforced when the movements were applied. A ledger that
/// dips below zero part-way, or is listed out of apply order, is an invariant
/// violation even if its totals add up.
pub fn replay<'a, I>(transactions: I) -> DomainResult<StockLevel>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut level = StockLevel::default();
    for (position, tx) in transactions.into_iter().enumerate() {
        tx.validate()?;
        let delta = tx.delta();
        let quantity = level
            .quantity
            .checked_add(delta.quantity)
            .ok_or_else(|| DomainError::invariant("ledger quantity total overflows"))?;
        let reserved = level
            .reserved
            .checked_add(delta.reserved)
            .ok_or_else(|| DomainError::invariant("ledger reserved total overflows"))?;
        level = StockLevel::new(quantity, reserved);

        if !level.is_consistent() {
            return Err(DomainError::invariant(format!(
                "ledger entry {position} ({} {}, transaction {}) reaches an unreachable level (quantity={}, reserved={})",
                tx.kind, tx.quantity, tx.id, level.quantity, level.reserved
            )));
        }
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::StockDelta;
    use crate::transaction::TransactionType;
    use chrono::Utc;
    use stockledger_core::{InventoryItemId, ProductId};

    fn tx(kind: TransactionType, quantity: i64) -> Transaction {
        Transaction::record(
            InventoryItemId::new(),
            ProductId::new(),
            kind,
            quantity,
            "REF",
            "",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_ledger_replays_to_zero() {
        assert_eq!(replay(std::iter::empty()).unwrap(), StockLevel::default());
    }

    #[test]
    fn replay_sums_all_movement_kinds() {
        let ledger = vec![
            tx(TransactionType::In, 50),
            tx(TransactionType::In, 20),
            tx(TransactionType::Reserve, 10),
            tx(TransactionType::Out, 30),
            tx(TransactionType::Unreserve, 4),
            tx(TransactionType::Return, 2),
        ];
        assert_eq!(replay(&ledger).unwrap(), StockLevel::new(42, 6));
    }

    #[test]
    fn replay_rejects_unreachable_ledger() {
        let ledger = vec![tx(TransactionType::In, 5), tx(TransactionType::Reserve, 6)];
        let err = replay(&ledger).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn replay_checks_every_step_not_just_the_total() {
        // Totals agree with quantity 0, but the removal is listed before the
        // addition that funded it.
        let ledger = vec![tx(TransactionType::Out, 10), tx(TransactionType::In, 10)];
        let err = replay(&ledger).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let in_apply_order = vec![tx(TransactionType::In, 10), tx(TransactionType::Out, 10)];
        assert_eq!(replay(&in_apply_order).unwrap(), StockLevel::default());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn movement() -> impl Strategy<Value = (TransactionType, i64)> {
            (prop::sample::select(TransactionType::ALL.to_vec()), 1i64..100)
        }

        proptest! {
            /// Property: applying guarded movements one by one and recording only the
            /// accepted ones yields a ledger that replays to the live level, and the
            /// totals obey conservation.
            #[test]
            fn accepted_movements_replay_to_live_level(
                initial in 0i64..500,
                moves in prop::collection::vec(movement(), 0..60),
            ) {
                let mut live = StockLevel::default();
                let mut ledger = Vec::new();

                if initial > 0 {
                    live = StockDelta::new(initial, 0).apply_to(live).unwrap();
                    ledger.push(tx(TransactionType::In, initial));
                }

                for (kind, qty) in moves {
                    if let Some(next) = kind.delta(qty).apply_to(live) {
                        live = next;
                        ledger.push(tx(kind, qty));
                    }
                    prop_assert!(live.is_consistent());
                }

                let sum = |k: TransactionType| -> i64 {
                    ledger.iter().filter(|t| t.kind == k).map(|t| t.quantity).sum()
                };
                prop_assert_eq!(
                    live.quantity,
                    sum(TransactionType::In) + sum(TransactionType::Return) - sum(TransactionType::Out)
                );
                prop_assert_eq!(
                    live.reserved,
                    sum(TransactionType::Reserve) - sum(TransactionType::Unreserve)
                );
                prop_assert_eq!(replay(&ledger).unwrap(), live);
            }
        }
    }
}
