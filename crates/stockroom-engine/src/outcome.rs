//! Results returned by engine operations.

use serde::Serialize;
use serde_json::{json, Value};

use stockroom_core::{Allocation, AuditStatus, InventoryRecord, Reservation, SkuTotal};

use crate::error::{EngineError, ErrorCode, ErrorDetail};

// =============================================================================
// Multi-item Operations
// =============================================================================

/// What a successful item did to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Inbound, return or adjustment: the record as written.
    Stocked(InventoryRecord),
    /// Outbound: the lots that were drawn down.
    Shipped(Allocation),
}

/// Result of one line of a multi-item operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    /// Zero-based position in the request.
    pub index: usize,
    pub sku: String,
    pub outcome: Result<ItemEffect, ErrorDetail>,
}

impl ItemOutcome {
    pub fn new(
        index: usize,
        sku: impl Into<String>,
        result: Result<ItemEffect, EngineError>,
    ) -> Self {
        Self {
            index,
            sku: sku.into(),
            outcome: result.map_err(|e| e.detail()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.outcome.as_ref().err()
    }

    pub fn effect(&self) -> Option<&ItemEffect> {
        self.outcome.as_ref().ok()
    }
}

/// Report of a multi-item operation (inbound, return, adjustment, outbound).
///
/// Items are independent: a failed item does not stop later items and does
/// not undo earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub id_stamp: String,
    /// SUCCESS only if every item succeeded.
    pub status: AuditStatus,
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn new(id_stamp: impl Into<String>, items: Vec<ItemOutcome>) -> Self {
        let status = if !items.is_empty() && items.iter().all(ItemOutcome::is_ok) {
            AuditStatus::Success
        } else {
            AuditStatus::Failed
        };
        Self {
            id_stamp: id_stamp.into(),
            status,
            items,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AuditStatus::Success
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|i| !i.is_ok())
    }

    /// Close message for the audit log.
    pub fn summary(&self) -> String {
        if self.items.is_empty() {
            return "no items".to_string();
        }
        format!("{} of {} item(s) applied", self.succeeded(), self.items.len())
    }

    /// Structured per-item failures for the audit log, `None` if all passed.
    pub fn error_details(&self) -> Option<Value> {
        if self.items.is_empty() {
            return Some(json!({
                "code": ErrorCode::ValidationError,
                "message": "no items",
            }));
        }

        let failed: Vec<Value> = self
            .failures()
            .filter_map(|item| {
                item.error().map(|e| {
                    json!({
                        "index": item.index,
                        "sku": item.sku,
                        "code": e.code,
                        "message": e.message,
                    })
                })
            })
            .collect();

        (!failed.is_empty()).then(|| json!({ "items": failed }))
    }
}

// =============================================================================
// Reservations
// =============================================================================

/// A returned reservation and the record the stock went back to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationReturn {
    pub reservation: Reservation,
    pub record: InventoryRecord,
}

/// A cancelled reservation and the records its lines were put back on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationCancel {
    pub reservation: Reservation,
    pub reinstated: Vec<InventoryRecord>,
}

// =============================================================================
// Reports
// =============================================================================

/// Stock position of one SKU.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSummary {
    pub sku: String,
    pub records: Vec<InventoryRecord>,
    /// Unreserved quantity on the ledger.
    pub available: i64,
    /// Quantity held by PENDING reservations.
    pub reserved: i64,
}

impl StockSummary {
    /// Available plus reserved.
    pub fn on_hand(&self) -> i64 {
        self.available.saturating_add(self.reserved)
    }
}

/// Low stock report line: SKU total and the threshold it was judged against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockLine {
    pub sku: String,
    pub total: i64,
    pub threshold: i64,
}

impl LowStockLine {
    pub fn from_total(total: SkuTotal, threshold: i64) -> Self {
        Self {
            sku: total.sku,
            total: total.total,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::CoreError;

    fn failed(index: usize) -> ItemOutcome {
        ItemOutcome::new(
            index,
            "SKU-2",
            Err(CoreError::record_not_found("SKU-2", "A", "L1").into()),
        )
    }

    fn shipped(index: usize) -> ItemOutcome {
        ItemOutcome::new(
            index,
            "SKU-1",
            Ok(ItemEffect::Shipped(Allocation {
                sku: "SKU-1".into(),
                requested: 1,
                deductions: vec![],
            })),
        )
    }

    #[test]
    fn test_all_ok_is_success() {
        let report = BatchReport::new("OUT-1", vec![shipped(0), shipped(1)]);
        assert!(report.is_success());
        assert_eq!(report.error_details(), None);
        assert_eq!(report.summary(), "2 of 2 item(s) applied");
    }

    #[test]
    fn test_partial_failure_details() {
        let report = BatchReport::new("ADJIN-1", vec![shipped(0), failed(1)]);
        assert_eq!(report.status, AuditStatus::Failed);
        assert_eq!(report.succeeded(), 1);

        let details = report.error_details().unwrap();
        assert_eq!(details["items"][0]["index"], 1);
        assert_eq!(details["items"][0]["code"], "RECORD_NOT_FOUND");
    }

    #[test]
    fn test_empty_batch_fails() {
        let report = BatchReport::new("IN-1", vec![]);
        assert_eq!(report.status, AuditStatus::Failed);
        assert_eq!(report.error_details().unwrap()["code"], "VALIDATION_ERROR");
    }
}
