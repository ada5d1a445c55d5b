//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  &self methods (pool)                 associated fns (connection)       │
//! │  ─────────────────────                ───────────────────────────       │
//! │  db.inventory().get(&key)             InventoryRepository::find(       │
//! │  db.inventory().low_stock(10)             &mut tx, &key)               │
//! │  db.reservations().list_pending()     ReservationRepository::insert(   │
//! │                                           &mut tx, &reservation)       │
//! │                                                                         │
//! │  Reads and reports: one statement,    Writes: run inside the caller's  │
//! │  any pooled connection.               transaction so a business        │
//! │                                       operation commits or rolls back  │
//! │                                       as a whole.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`](inventory::InventoryRepository) - stock records, FIFO scan, reports
//! - [`ReservationRepository`](reservation::ReservationRepository) - reservations and their lines
//! - [`AuditLogRepository`](audit::AuditLogRepository) - append-only transaction log

pub mod audit;
pub mod inventory;
pub mod reservation;

use chrono::{DateTime, Utc};

/// Who / which operation / when, stamped onto every row a write touches.
#[derive(Debug, Clone, Copy)]
pub struct WriteStamp<'a> {
    pub actor_id: &'a str,
    pub id_stamp: &'a str,
    pub at: DateTime<Utc>,
}
