//! # Domain Types
//!
//! Core data structures for the inventory ledger.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Data Model                                 │
//! │                                                                         │
//! │  ┌───────────────────────┐          ┌──────────────────────────┐       │
//! │  │   InventoryRecord     │          │      Reservation         │       │
//! │  │ (sku, lot, location)  │◄─────────│ reserve_id  (RES-...)    │       │
//! │  │ quantity >= 0         │ carved   │ status PENDING → ...     │       │
//! │  │ inbound_date (FIFO)   │ from     │ lines: 1..n              │       │
//! │  └───────────────────────┘          └────────────┬─────────────┘       │
//! │                                                  │                      │
//! │                                     ┌────────────▼─────────────┐       │
//! │                                     │    ReservationLine       │       │
//! │                                     │ (lot, location, qty)     │       │
//! │                                     └──────────────────────────┘       │
//! │                                                                         │
//! │  Records are never deleted: a zero-quantity row is history.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Actor
// =============================================================================

/// The caller an operation is performed on behalf of.
///
/// Authorization happens upstream; by the time an `Actor` reaches the
/// engine it is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Identity of a stock record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryKey {
    pub sku: String,
    pub lot: String,
    pub location: String,
}

impl InventoryKey {
    pub fn new(
        sku: impl Into<String>,
        lot: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        InventoryKey {
            sku: sku.into(),
            lot: lot.into(),
            location: location.into(),
        }
    }
}

impl std::fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.sku, self.lot, self.location)
    }
}

/// One stock record: available (unreserved) quantity of a SKU in a lot at
/// a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryRecord {
    pub sku: String,
    pub lot: String,
    pub location: String,
    pub quantity: i64,
    /// Date the lot was first recorded; drives FIFO order.
    pub inbound_date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_date: DateTime<Utc>,
    pub last_updated_by: String,
    /// Id stamp of the last operation that touched this record.
    pub id_stamp: String,
}

impl InventoryRecord {
    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(&self.sku, &self.lot, &self.location)
    }
}

/// A lot with positive quantity, as returned by `ListAvailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AvailableLot {
    pub lot: String,
    pub location: String,
    pub quantity: i64,
    pub inbound_date: NaiveDate,
}

/// Per-SKU total used by stock reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SkuTotal {
    pub sku: String,
    pub total: i64,
}

// =============================================================================
// Reservation Status
// =============================================================================

/// Lifecycle state of a reservation.
///
/// ```text
///            ┌──► PICKED
/// PENDING ───┼──► RETURNED
///            └──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Picked,
    Returned,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Picked => "PICKED",
            ReservationStatus::Returned => "RETURNED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// One lot/location slice of a reservation's allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReservationLine {
    pub line_no: i64,
    pub lot: String,
    pub location: String,
    pub quantity: i64,
}

/// Stock carved out of the ledger and held against a future pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reservation {
    pub reserve_id: String,
    pub sku: String,
    /// Originally reserved quantity.
    pub quantity: i64,
    pub reserved_by: String,
    pub reservation_date: DateTime<Utc>,
    pub status: ReservationStatus,
    /// First lot of the allocation.
    pub reserved_lot: String,
    /// First location of the allocation.
    pub reserved_location: String,
    pub id_stamp: String,

    pub picked_by: Option<String>,
    pub picked_at: Option<DateTime<Utc>>,
    pub picked_quantity: Option<i64>,

    pub returned_by: Option<String>,
    pub returned_at: Option<DateTime<Utc>>,
    pub returned_quantity: Option<i64>,
    pub return_reason: Option<String>,

    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,

    /// Full ordered allocation; loaded separately from `reservation_lines`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub lines: Vec<ReservationLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(ReservationStatus::Pending.as_str(), "PENDING");
        assert_eq!(ReservationStatus::Cancelled.to_string(), "CANCELLED");
        assert!(ReservationStatus::default().is_pending());
        assert!(!ReservationStatus::Picked.is_pending());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&ReservationStatus::Returned).unwrap();
        assert_eq!(json, "\"RETURNED\"");
    }

    #[test]
    fn test_key_display() {
        let key = InventoryKey::new("SKU-1", "A", "L1");
        assert_eq!(key.to_string(), "SKU-1/A/L1");
    }
}
