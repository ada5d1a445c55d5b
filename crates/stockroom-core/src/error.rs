//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Ledger / allocation / reservation rules        │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Store operation failures                       │
//! │                                                                         │
//! │  stockroom-engine errors                                               │
//! │  └── EngineError      - Either of the above + machine-readable code    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError ───┴→ EngineError → audit log         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger, the allocator and the
/// reservation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Quantity was zero or negative where a positive amount is required.
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: i64 },

    /// Quantity text is not an integer at all.
    #[error("Invalid quantity '{value}': not an integer")]
    UnparsableQuantity { value: String },

    /// A receipt would push a record past the largest representable quantity.
    #[error(
        "Adding {delta} to {sku}/{lot}/{location} (current {current}) exceeds the maximum quantity"
    )]
    QuantityOverflow {
        sku: String,
        lot: String,
        location: String,
        current: i64,
        delta: i64,
    },

    /// Date string is not `YYYY-MM-DD`.
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// Not enough available stock to satisfy an allocation.
    ///
    /// ## User Workflow
    /// ```text
    /// Outbound SKU-1 qty 100
    ///      │
    ///      ▼
    /// ListAvailable: A=5, B=10 (total 15)
    ///      │
    ///      ▼
    /// InsufficientStock { requested: 100, available: 15, shortfall: 85 }
    ///      │
    ///      ▼
    /// Nothing deducted
    /// ```
    #[error(
        "Insufficient stock for {sku}: requested {requested}, available {available}, short by {shortfall}"
    )]
    InsufficientStock {
        sku: String,
        requested: i64,
        available: i64,
        shortfall: i64,
    },

    /// An adjustment would drive a record below zero.
    #[error(
        "Adjustment of {delta} on {sku}/{lot}/{location} would leave {resulting} (current {current})"
    )]
    NegativeQuantity {
        sku: String,
        lot: String,
        location: String,
        current: i64,
        delta: i64,
        resulting: i64,
    },

    /// No inventory record exists for the exact key.
    #[error("No inventory record for {sku}/{lot}/{location}")]
    RecordNotFound {
        sku: String,
        lot: String,
        location: String,
    },

    /// No reservation matches the identifying fields (or it is in the wrong status).
    #[error("Reservation not found or not in a usable state: {reserve_id}")]
    ReservationNotFound { reserve_id: String },

    /// Pick quantity exceeds the reserved quantity.
    #[error("Cannot pick {requested} from reservation {reserve_id}: only {reserved} reserved")]
    OverPick {
        reserve_id: String,
        requested: i64,
        reserved: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a RecordNotFound error from key parts.
    pub fn record_not_found(
        sku: impl Into<String>,
        lot: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        CoreError::RecordNotFound {
            sku: sku.into(),
            lot: lot.into(),
            location: location.into(),
        }
    }

    /// Creates a ReservationNotFound error.
    pub fn reservation_not_found(reserve_id: impl Into<String>) -> Self {
        CoreError::ReservationNotFound {
            reserve_id: reserve_id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs, usually while turning parser
/// output into typed request lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., non-numeric quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
