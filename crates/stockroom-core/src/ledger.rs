//! # Ledger Delta Planning
//!
//! Decides what a signed quantity change does to a stock record, without
//! touching storage. The store layer executes the resulting [`DeltaPlan`].
//!
//! ## Decision Table
//! ```text
//! ┌──────────────────┬───────────────┬────────────────────────────────────┐
//! │ record exists?   │ mode          │ result                             │
//! ├──────────────────┼───────────────┼────────────────────────────────────┤
//! │ yes              │ any           │ Update(current + delta), or        │
//! │                  │               │ NegativeQuantity if < 0,           │
//! │                  │               │ QuantityOverflow past i64::MAX     │
//! │ no               │ Receive, d>0  │ Insert(delta, inbound_date)        │
//! │ no               │ Adjustment    │ RecordNotFound                     │
//! └──────────────────┴───────────────┴────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::InventoryKey;

/// How a delta is allowed to treat a missing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaMode {
    /// Inbound, return, reinstatement: may create the record.
    Receive { inbound_date: NaiveDate },
    /// Signed correction of an existing record.
    Adjustment,
}

/// What the store must do to apply a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaPlan {
    /// Set the existing record's quantity.
    Update { previous: i64, new_quantity: i64 },
    /// Create the record.
    Insert {
        quantity: i64,
        inbound_date: NaiveDate,
    },
}

impl DeltaPlan {
    /// Quantity the record holds after the plan is applied.
    pub fn resulting_quantity(&self) -> i64 {
        match self {
            DeltaPlan::Update { new_quantity, .. } => *new_quantity,
            DeltaPlan::Insert { quantity, .. } => *quantity,
        }
    }
}

/// Plans a delta against the record's current quantity (`None` when the
/// key does not exist yet).
pub fn plan_delta(
    key: &InventoryKey,
    current: Option<i64>,
    delta: i64,
    mode: DeltaMode,
) -> CoreResult<DeltaPlan> {
    match mode {
        DeltaMode::Receive { .. } if delta <= 0 => {
            return Err(CoreError::InvalidQuantity { quantity: delta });
        }
        DeltaMode::Adjustment if delta == 0 => {
            return Err(CoreError::InvalidQuantity { quantity: delta });
        }
        _ => {}
    }

    match (current, mode) {
        (Some(previous), _) => {
            let new_quantity =
                previous
                    .checked_add(delta)
                    .ok_or_else(|| CoreError::QuantityOverflow {
                        sku: key.sku.clone(),
                        lot: key.lot.clone(),
                        location: key.location.clone(),
                        current: previous,
                        delta,
                    })?;
            if new_quantity < 0 {
                return Err(CoreError::NegativeQuantity {
                    sku: key.sku.clone(),
                    lot: key.lot.clone(),
                    location: key.location.clone(),
                    current: previous,
                    delta,
                    resulting: new_quantity,
                });
            }
            Ok(DeltaPlan::Update {
                previous,
                new_quantity,
            })
        }
        (None, DeltaMode::Receive { inbound_date }) => Ok(DeltaPlan::Insert {
            quantity: delta,
            inbound_date,
        }),
        (None, DeltaMode::Adjustment) => Err(CoreError::record_not_found(
            &key.sku,
            &key.lot,
            &key.location,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> InventoryKey {
        InventoryKey::new("SKU-1", "A", "L1")
    }

    fn receive() -> DeltaMode {
        DeltaMode::Receive {
            inbound_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_receive_creates_missing_record() {
        let plan = plan_delta(&key(), None, 5, receive()).unwrap();
        assert_eq!(
            plan,
            DeltaPlan::Insert {
                quantity: 5,
                inbound_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
            }
        );
    }

    #[test]
    fn test_receive_adds_to_existing_record() {
        let plan = plan_delta(&key(), Some(5), 3, receive()).unwrap();
        assert_eq!(plan.resulting_quantity(), 8);
    }

    #[test]
    fn test_receive_rejects_non_positive() {
        assert_eq!(
            plan_delta(&key(), Some(5), 0, receive()).unwrap_err(),
            CoreError::InvalidQuantity { quantity: 0 }
        );
    }

    #[test]
    fn test_adjustment_below_zero_rejected() {
        let err = plan_delta(&key(), Some(3), -5, DeltaMode::Adjustment).unwrap_err();
        assert!(matches!(
            err,
            CoreError::NegativeQuantity {
                current: 3,
                delta: -5,
                resulting: -2,
                ..
            }
        ));
    }

    #[test]
    fn test_adjustment_to_exactly_zero_allowed() {
        let plan = plan_delta(&key(), Some(3), -3, DeltaMode::Adjustment).unwrap();
        assert_eq!(plan.resulting_quantity(), 0);
    }

    #[test]
    fn test_receive_past_max_overflows() {
        let err = plan_delta(&key(), Some(i64::MAX), 1, receive()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuantityOverflow {
                current: i64::MAX,
                delta: 1,
                ..
            }
        ));

        let plan = plan_delta(&key(), Some(i64::MAX - 1), 1, receive()).unwrap();
        assert_eq!(plan.resulting_quantity(), i64::MAX);
    }

    #[test]
    fn test_adjustment_missing_record() {
        assert!(matches!(
            plan_delta(&key(), None, 4, DeltaMode::Adjustment),
            Err(CoreError::RecordNotFound { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Any sequence of positive receipts on one key leaves the record at
        /// the sum of the deltas.
        #[test]
        fn receipts_sum(amounts in prop::collection::vec(1i64..1_000_000i64, 1..10)) {
            let mut current: Option<i64> = None;
            for amount in &amounts {
                let plan = plan_delta(&key(), current, *amount, receive()).unwrap();
                current = Some(plan.resulting_quantity());
            }
            prop_assert_eq!(current, Some(amounts.iter().sum::<i64>()));
        }

        /// Adjustments never produce a negative quantity.
        #[test]
        fn adjustments_never_negative(start in 0i64..1000, delta in -2000i64..2000) {
            match plan_delta(&key(), Some(start), delta, DeltaMode::Adjustment) {
                Ok(plan) => prop_assert!(plan.resulting_quantity() >= 0),
                Err(CoreError::NegativeQuantity { .. }) => prop_assert!(start + delta < 0),
                Err(CoreError::InvalidQuantity { .. }) => prop_assert_eq!(delta, 0),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
