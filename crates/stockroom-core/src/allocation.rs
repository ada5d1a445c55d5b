//! # FIFO Allocation
//!
//! Pure allocation planning: given the available lots of a SKU, decide
//! which (lot, location) pairs to deduct and by how much.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate("SKU-1", 8, lots)                                             │
//! │                                                                         │
//! │  lots (oldest first):  A 2025-01-01 qty 5 │ B 2025-02-01 qty 10         │
//! │                                                                         │
//! │  1. requested <= 0 ?            → InvalidQuantity                       │
//! │  2. total(5 + 10) < 8 ?         → no                                    │
//! │  3. walk: take min(remaining, lot.qty)                                  │
//! │        A: take 5, remaining 3                                           │
//! │        B: take 3, remaining 0 → stop                                    │
//! │                                                                         │
//! │  Allocation { deductions: [(A, L1, 5), (B, L1, 3)] }                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan is applied by the caller inside a store transaction. Planning
//! itself never touches the ledger, so a failed plan leaves stock unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::AvailableLot;

/// One (lot, location, quantity) deduction of an allocation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub lot: String,
    pub location: String,
    pub quantity: i64,
}

/// The result of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub sku: String,
    pub requested: i64,
    /// Deductions in FIFO order; always sums to `requested`.
    pub deductions: Vec<Deduction>,
}

impl Allocation {
    /// Sum of all deductions.
    pub fn total(&self) -> i64 {
        self.deductions.iter().map(|d| d.quantity).sum()
    }

    /// The oldest lot touched by this allocation.
    pub fn first(&self) -> Option<&Deduction> {
        self.deductions.first()
    }
}

/// Plans a FIFO allocation of `requested` units of `sku`.
///
/// Lots with non-positive quantity are ignored. Lots are consumed in
/// `inbound_date` order; equal dates keep the order they were given in.
pub fn allocate(sku: &str, requested: i64, lots: &[AvailableLot]) -> CoreResult<Allocation> {
    if requested <= 0 {
        return Err(CoreError::InvalidQuantity {
            quantity: requested,
        });
    }

    let mut ordered: Vec<&AvailableLot> = lots.iter().filter(|lot| lot.quantity > 0).collect();
    // stable: ties keep store order
    ordered.sort_by_key(|lot| lot.inbound_date);

    // saturates: a capped total is still >= requested
    let available = ordered
        .iter()
        .fold(0i64, |total, lot| total.saturating_add(lot.quantity));
    if available < requested {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            requested,
            available,
            shortfall: requested - available,
        });
    }

    let mut remaining = requested;
    let mut deductions = Vec::new();
    for lot in ordered {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.quantity);
        deductions.push(Deduction {
            lot: lot.lot.clone(),
            location: lot.location.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    Ok(Allocation {
        sku: sku.to_string(),
        requested,
        deductions,
    })
}
