//! # Audit Log Types
//!
//! Entries of the append-only transaction log, and the stock movement view
//! derived from it.
//!
//! ## Entry Pairing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  id_stamp OUT-20250101-093000-1a2b3c4d                                 │
//! │                                                                         │
//! │  seq 41  PROCESSING  "Processing outbound"        ← open entry         │
//! │  seq 42  SUCCESS     "Outbound completed: 2/2"    ← close entry        │
//! │                                                                         │
//! │  Exactly one open and one terminal close entry per business operation. │
//! │  Entries are never updated or deleted.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Command Type
// =============================================================================

/// The business operation an audit entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "in"))]
    #[serde(rename = "in")]
    Inbound,
    Return,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "adjust_in"))]
    #[serde(rename = "adjust_in")]
    Adjustment,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "out"))]
    #[serde(rename = "out")]
    Outbound,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "cancel_out"))]
    #[serde(rename = "cancel_out")]
    CancelOutbound,
    Reserve,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "reserve_pick"))]
    #[serde(rename = "reserve_pick")]
    Pick,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "reserve_return"))]
    #[serde(rename = "reserve_return")]
    ReturnReservation,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "reserve_cancel"))]
    #[serde(rename = "reserve_cancel")]
    CancelReservation,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "reserve_check"))]
    #[serde(rename = "reserve_check")]
    ReserveCheck,
}

impl CommandType {
    /// Stored / serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Inbound => "in",
            CommandType::Return => "return",
            CommandType::Adjustment => "adjust_in",
            CommandType::Outbound => "out",
            CommandType::CancelOutbound => "cancel_out",
            CommandType::Reserve => "reserve",
            CommandType::Pick => "reserve_pick",
            CommandType::ReturnReservation => "reserve_return",
            CommandType::CancelReservation => "reserve_cancel",
            CommandType::ReserveCheck => "reserve_check",
        }
    }

    /// Prefix of the id stamps generated for this command.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            CommandType::Inbound => "IN",
            CommandType::Return => "RET",
            CommandType::Adjustment => "ADJIN",
            CommandType::Outbound => "OUT",
            CommandType::CancelOutbound => "CANOUT",
            CommandType::Reserve => "RESV",
            CommandType::Pick => "RESPK",
            CommandType::ReturnReservation => "RETRN",
            CommandType::CancelReservation => "RESCN",
            CommandType::ReserveCheck => "RESCK",
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            CommandType::Inbound,
            CommandType::Return,
            CommandType::Adjustment,
            CommandType::Outbound,
            CommandType::CancelOutbound,
            CommandType::Reserve,
            CommandType::Pick,
            CommandType::ReturnReservation,
            CommandType::CancelReservation,
            CommandType::ReserveCheck,
        ];
        all.into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown command type: '{}'", s))
    }
}

// =============================================================================
// Audit Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Processing,
    Success,
    Failed,
    PendingConfirmation,
    Cancelled,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Processing => "PROCESSING",
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Failed => "FAILED",
            AuditStatus::PendingConfirmation => "PENDING_CONFIRMATION",
            AuditStatus::Cancelled => "CANCELLED",
        }
    }

    /// True for statuses that close an operation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuditStatus::Success | AuditStatus::Failed | AuditStatus::Cancelled
        )
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Audit Log Entry
// =============================================================================

/// One line of the transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Append sequence; assigned by the store.
    #[serde(default)]
    pub seq: i64,
    pub id_stamp: String,
    pub timestamp: DateTime<Utc>,
    pub command_type: CommandType,
    pub actor_id: String,
    pub actor_name: String,
    pub raw_command: String,
    pub parsed_details: Option<Value>,
    pub status: AuditStatus,
    pub message: String,
    pub error_details: Option<Value>,
}

/// Filter for reading the log back. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub id_stamp: Option<String>,
    pub command_type: Option<CommandType>,
    pub actor_id: Option<String>,
    pub status: Option<AuditStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Direction of a stock movement as seen by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    Received,
    Returned,
    Shipped,
    AdjustedUp,
    AdjustedDown,
    Reserved,
    Picked,
    ReservationReturned,
    ReservationCancelled,
    OutboundCancelled,
}

/// A successful stock-changing operation extracted from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id_stamp: String,
    pub timestamp: DateTime<Utc>,
    pub command_type: CommandType,
    pub direction: MovementDirection,
    pub skus: Vec<String>,
    pub quantity: Option<i64>,
    pub actor_id: String,
    pub actor_name: String,
    pub message: String,
}

impl StockMovement {
    /// Derives a movement from a SUCCESS close entry.
    ///
    /// `parsed_details` is expected to carry either `items: [{sku, quantity}]`
    /// or top-level `sku` / `quantity`. Anything else (reserve checks,
    /// non-success entries) yields `None`.
    pub fn from_entry(entry: &AuditLogEntry) -> Option<Self> {
        if entry.status != AuditStatus::Success {
            return None;
        }
        let details = entry.parsed_details.as_ref()?;

        let (skus, quantity) = match details.get("items").and_then(Value::as_array) {
            Some(items) => {
                let skus: Vec<String> = items
                    .iter()
                    .filter_map(|i| i.get("sku").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                let quantities: Vec<i64> = items
                    .iter()
                    .filter_map(|i| item_quantity(i))
                    .collect();
                let quantity = (!quantities.is_empty())
                    .then(|| quantities.iter().fold(0i64, |sum, q| sum.saturating_add(*q)));
                (skus, quantity)
            }
            None => {
                let sku = details.get("sku").and_then(Value::as_str)?;
                (vec![sku.to_string()], item_quantity(details))
            }
        };

        let direction = match entry.command_type {
            CommandType::Inbound => MovementDirection::Received,
            CommandType::Return => MovementDirection::Returned,
            CommandType::Outbound => MovementDirection::Shipped,
            CommandType::Adjustment => match quantity {
                Some(q) if q < 0 => MovementDirection::AdjustedDown,
                _ => MovementDirection::AdjustedUp,
            },
            CommandType::CancelOutbound => MovementDirection::OutboundCancelled,
            CommandType::Reserve => MovementDirection::Reserved,
            CommandType::Pick => MovementDirection::Picked,
            CommandType::ReturnReservation => MovementDirection::ReservationReturned,
            CommandType::CancelReservation => MovementDirection::ReservationCancelled,
            CommandType::ReserveCheck => return None,
        };

        Some(StockMovement {
            id_stamp: entry.id_stamp.clone(),
            timestamp: entry.timestamp,
            command_type: entry.command_type,
            direction,
            skus,
            quantity,
            actor_id: entry.actor_id.clone(),
            actor_name: entry.actor_name.clone(),
            message: entry.message.clone(),
        })
    }
}

fn item_quantity(item: &Value) -> Option<i64> {
    item.get("quantity")
        .or_else(|| item.get("delta"))
        .and_then(Value::as_i64)
}
