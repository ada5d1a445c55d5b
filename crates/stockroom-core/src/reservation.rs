//! # Reservation Lifecycle
//!
//! Construction of new reservations and the transition rules for pick,
//! return and cancel.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Reserve ──► PENDING ──── Pick (qty <= reserved) ───► PICKED          │
//! │                  │                                                      │
//! │                  ├──────── Cancel (reinstate lines) ──► CANCELLED       │
//! │                  │                                                      │
//! │   any status ────┴──────── Return (reinstate qty) ────► RETURNED       │
//! │                                                                         │
//! │   Pick / Cancel on a non-PENDING reservation → ReservationNotFound     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Return is deliberately accepted from any status, matching how the
//! warehouse floor uses it to put stock back after a partial pick.

use chrono::{DateTime, Utc};

use crate::allocation::Allocation;
use crate::error::{CoreError, CoreResult};
use crate::types::{Actor, Reservation, ReservationLine, ReservationStatus};

impl Reservation {
    /// Builds a PENDING reservation from an applied allocation.
    pub fn pending(
        reserve_id: impl Into<String>,
        allocation: &Allocation,
        actor: &Actor,
        reserved_at: DateTime<Utc>,
        id_stamp: impl Into<String>,
    ) -> CoreResult<Self> {
        let first = allocation.first().ok_or(CoreError::InvalidQuantity {
            quantity: allocation.total(),
        })?;

        let lines = allocation
            .deductions
            .iter()
            .enumerate()
            .map(|(i, d)| ReservationLine {
                line_no: i as i64 + 1,
                lot: d.lot.clone(),
                location: d.location.clone(),
                quantity: d.quantity,
            })
            .collect();

        Ok(Reservation {
            reserve_id: reserve_id.into(),
            sku: allocation.sku.clone(),
            quantity: allocation.total(),
            reserved_by: actor.id.clone(),
            reservation_date: reserved_at,
            status: ReservationStatus::Pending,
            reserved_lot: first.lot.clone(),
            reserved_location: first.location.clone(),
            id_stamp: id_stamp.into(),
            picked_by: None,
            picked_at: None,
            picked_quantity: None,
            returned_by: None,
            returned_at: None,
            returned_quantity: None,
            return_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            cancel_reason: None,
            lines,
        })
    }

    /// True if (lot, location) is the reserved pair or any allocation line.
    pub fn holds(&self, lot: &str, location: &str) -> bool {
        (self.reserved_lot == lot && self.reserved_location == location)
            || self
                .lines
                .iter()
                .any(|line| line.lot == lot && line.location == location)
    }

    /// Lines to put back on cancel. Reservations stored without lines fall
    /// back to the full quantity at the reserved lot/location.
    pub fn reinstatement_lines(&self) -> Vec<ReservationLine> {
        if self.lines.is_empty() {
            vec![ReservationLine {
                line_no: 1,
                lot: self.reserved_lot.clone(),
                location: self.reserved_location.clone(),
                quantity: self.quantity,
            }]
        } else {
            self.lines.clone()
        }
    }

    fn identifies(&self, sku: &str, lot: &str, location: &str) -> bool {
        self.sku == sku && self.holds(lot, location)
    }
}

/// Identifies the reservation targeted by a pick or return request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationTarget<'a> {
    pub reserve_id: &'a str,
    pub sku: &'a str,
    pub lot: &'a str,
    pub location: &'a str,
}

/// Validates a pick against the stored reservation (`None` if the id is unknown).
pub fn check_pick(
    reservation: Option<&Reservation>,
    target: &ReservationTarget<'_>,
    quantity: i64,
) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }

    let reservation = reservation
        .filter(|r| r.status.is_pending())
        .filter(|r| r.identifies(target.sku, target.lot, target.location))
        .ok_or_else(|| CoreError::reservation_not_found(target.reserve_id))?;

    if quantity > reservation.quantity {
        return Err(CoreError::OverPick {
            reserve_id: reservation.reserve_id.clone(),
            requested: quantity,
            reserved: reservation.quantity,
        });
    }

    Ok(())
}

/// Validates a return. Status is not checked.
pub fn check_return(
    reservation: Option<&Reservation>,
    target: &ReservationTarget<'_>,
    quantity: i64,
) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }

    reservation
        .filter(|r| r.identifies(target.sku, target.lot, target.location))
        .map(|_| ())
        .ok_or_else(|| CoreError::reservation_not_found(target.reserve_id))
}

/// Validates a cancel: only PENDING reservations can be cancelled.
pub fn check_cancel(reservation: Option<&Reservation>, reserve_id: &str) -> CoreResult<()> {
    match reservation {
        Some(r) if r.status.is_pending() => Ok(()),
        _ => Err(CoreError::reservation_not_found(reserve_id)),
    }
}
