//! # stockroom-core: Pure Ledger Logic for Stockroom
//!
//! This crate is the **heart** of Stockroom. It holds the rules of the
//! inventory ledger as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Command parser / chat front-end (external)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ structured fields                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockroom-engine                             │   │
//! │  │    inbound, outbound, adjust, reserve, pick, cancel, audit     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌─────────────┐  ┌─────────┐  │   │
//! │  │   │   types   │  │ allocation │  │ reservation │  │  audit  │  │   │
//! │  │   │  Record   │  │   FIFO     │  │ state rules │  │ entries │  │   │
//! │  │   │  Reserv.  │  │  ledger Δ  │  │             │  │ id stamp│  │   │
//! │  │   └───────────┘  └────────────┘  └─────────────┘  └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockroom-db (Database Layer)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records, reservations, actors
//! - [`allocation`] - FIFO allocation planning
//! - [`ledger`] - Delta planning for a single stock record
//! - [`reservation`] - Reservation construction and transition rules
//! - [`audit`] - Audit log entries and stock movements
//! - [`id_stamp`] - Correlation / reservation id generation
//! - [`validation`] - Field validation and parsing
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use stockroom_core::allocation::allocate;
//! use stockroom_core::AvailableLot;
//!
//! let lots = vec![
//!     AvailableLot {
//!         lot: "A".into(),
//!         location: "L1".into(),
//!         quantity: 5,
//!         inbound_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!     },
//!     AvailableLot {
//!         lot: "B".into(),
//!         location: "L1".into(),
//!         quantity: 10,
//!         inbound_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
//!     },
//! ];
//!
//! let plan = allocate("SKU-1", 8, &lots).unwrap();
//! assert_eq!(plan.deductions[0].quantity, 5);
//! assert_eq!(plan.deductions[1].quantity, 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod audit;
pub mod error;
pub mod id_stamp;
pub mod ledger;
pub mod reservation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{allocate, Allocation, Deduction};
pub use audit::{
    AuditFilter, AuditLogEntry, AuditStatus, CommandType, MovementDirection, StockMovement,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use id_stamp::IdStamp;
pub use ledger::{plan_delta, DeltaMode, DeltaPlan};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a SKU, lot or location code.
pub const MAX_CODE_LEN: usize = 64;

/// Default threshold for the low-stock report.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
