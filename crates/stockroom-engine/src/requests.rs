//! # Request Lines
//!
//! Typed inputs of the engine operations. A command parser upstream splits
//! text into fields; the `parse` constructors here turn those fields into
//! typed lines, and `validate` re-checks lines built directly in code.
//!
//! Lines serialize into the audit log's `parsed_details`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::validation::{
    ensure_positive, parse_date, parse_quantity, parse_signed_quantity, validate_location,
    validate_lot, validate_sku,
};
use stockroom_core::reservation::ReservationTarget;
use stockroom_core::{CoreResult, InventoryKey, ValidationError};

fn validate_key(sku: &str, lot: &str, location: &str) -> CoreResult<()> {
    validate_sku(sku)?;
    validate_lot(lot)?;
    validate_location(location)?;
    Ok(())
}

fn validate_reserve_id(reserve_id: &str) -> CoreResult<()> {
    if reserve_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reserve_id".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Inbound / Return
// =============================================================================

/// One line of an inbound or return: `quantity` units into an exact key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub sku: String,
    pub quantity: i64,
    pub lot: String,
    pub location: String,
    /// Inbound date if the record is created by this line.
    pub date: NaiveDate,
}

impl ReceiptLine {
    pub fn new(
        sku: impl Into<String>,
        quantity: i64,
        lot: impl Into<String>,
        location: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            lot: lot.into(),
            location: location.into(),
            date,
        }
    }

    /// Builds a line from raw parser fields.
    pub fn parse(
        sku: &str,
        quantity: &str,
        lot: &str,
        location: &str,
        date: &str,
    ) -> CoreResult<Self> {
        let line = Self::new(
            sku.trim(),
            parse_quantity(quantity)?,
            lot.trim(),
            location.trim(),
            parse_date(date)?,
        );
        line.validate()?;
        Ok(line)
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_key(&self.sku, &self.lot, &self.location)?;
        ensure_positive(self.quantity)
    }

    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(&self.sku, &self.lot, &self.location)
    }
}

// =============================================================================
// Adjustment
// =============================================================================

/// One line of an adjustment: a signed correction of an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentLine {
    pub sku: String,
    pub delta: i64,
    pub lot: String,
    pub location: String,
    /// Date the count was taken, recorded in the audit log only.
    pub date: Option<NaiveDate>,
    pub reason: String,
}

impl AdjustmentLine {
    pub fn new(
        sku: impl Into<String>,
        delta: i64,
        lot: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            sku: sku.into(),
            delta,
            lot: lot.into(),
            location: location.into(),
            date: None,
            reason: reason.into(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Builds a line from raw parser fields. An empty date is allowed.
    pub fn parse(
        sku: &str,
        delta: &str,
        lot: &str,
        location: &str,
        date: &str,
        reason: &str,
    ) -> CoreResult<Self> {
        let mut line = Self::new(
            sku.trim(),
            parse_signed_quantity(delta)?,
            lot.trim(),
            location.trim(),
            reason.trim(),
        );
        if !date.trim().is_empty() {
            line.date = Some(parse_date(date)?);
        }
        line.validate()?;
        Ok(line)
    }

    /// Zero deltas are left to the ledger planner.
    pub fn validate(&self) -> CoreResult<()> {
        validate_key(&self.sku, &self.lot, &self.location)
    }

    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(&self.sku, &self.lot, &self.location)
    }
}

// =============================================================================
// Outbound / Cancel-outbound
// =============================================================================

/// One line of an outbound (or a cancel-outbound): SKU level, lots are
/// chosen by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundLine {
    pub sku: String,
    pub quantity: i64,
    pub reason: String,
}

impl OutboundLine {
    pub fn new(sku: impl Into<String>, quantity: i64, reason: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            reason: reason.into(),
        }
    }

    pub fn parse(sku: &str, quantity: &str, reason: &str) -> CoreResult<Self> {
        let line = Self::new(sku.trim(), parse_quantity(quantity)?, reason.trim());
        line.validate()?;
        Ok(line)
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_sku(&self.sku)?;
        ensure_positive(self.quantity)
    }
}

// =============================================================================
// Reservation Requests
// =============================================================================

/// Pick against a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest {
    pub reserve_id: String,
    pub sku: String,
    pub lot: String,
    pub location: String,
    pub quantity: i64,
}

impl PickRequest {
    pub fn new(
        reserve_id: impl Into<String>,
        sku: impl Into<String>,
        lot: impl Into<String>,
        location: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            reserve_id: reserve_id.into(),
            sku: sku.into(),
            lot: lot.into(),
            location: location.into(),
            quantity,
        }
    }

    pub fn parse(
        reserve_id: &str,
        sku: &str,
        lot: &str,
        location: &str,
        quantity: &str,
    ) -> CoreResult<Self> {
        let request = Self::new(
            reserve_id.trim(),
            sku.trim(),
            lot.trim(),
            location.trim(),
            parse_signed_quantity(quantity)?,
        );
        request.validate()?;
        Ok(request)
    }

    /// Field checks only; the quantity is checked against the reservation.
    pub fn validate(&self) -> CoreResult<()> {
        validate_reserve_id(&self.reserve_id)?;
        validate_key(&self.sku, &self.lot, &self.location)
    }

    pub fn target(&self) -> ReservationTarget<'_> {
        ReservationTarget {
            reserve_id: &self.reserve_id,
            sku: &self.sku,
            lot: &self.lot,
            location: &self.location,
        }
    }
}

/// Return of reserved stock back onto the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub reserve_id: String,
    pub sku: String,
    pub lot: String,
    pub location: String,
    pub quantity: i64,
    pub reason: String,
}

impl ReturnRequest {
    pub fn new(
        reserve_id: impl Into<String>,
        sku: impl Into<String>,
        lot: impl Into<String>,
        location: impl Into<String>,
        quantity: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            reserve_id: reserve_id.into(),
            sku: sku.into(),
            lot: lot.into(),
            location: location.into(),
            quantity,
            reason: reason.into(),
        }
    }

    pub fn parse(
        reserve_id: &str,
        sku: &str,
        lot: &str,
        location: &str,
        quantity: &str,
        reason: &str,
    ) -> CoreResult<Self> {
        let request = Self::new(
            reserve_id.trim(),
            sku.trim(),
            lot.trim(),
            location.trim(),
            parse_quantity(quantity)?,
            reason.trim(),
        );
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_reserve_id(&self.reserve_id)?;
        validate_key(&self.sku, &self.lot, &self.location)
    }

    pub fn target(&self) -> ReservationTarget<'_> {
        ReservationTarget {
            reserve_id: &self.reserve_id,
            sku: &self.sku,
            lot: &self.lot,
            location: &self.location,
        }
    }

    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(&self.sku, &self.lot, &self.location)
    }
}

/// Checks a reservation id supplied on its own (cancel).
pub fn parse_reserve_id(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    validate_reserve_id(trimmed)?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::CoreError;

    #[test]
    fn test_receipt_parse() {
        let line = ReceiptLine::parse("SKU-1", "5", "A", "L1", "2025-01-01").unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.key(), InventoryKey::new("SKU-1", "A", "L1"));

        assert_eq!(
            ReceiptLine::parse("SKU-1", "0", "A", "L1", "2025-01-01").unwrap_err(),
            CoreError::InvalidQuantity { quantity: 0 }
        );
        assert!(matches!(
            ReceiptLine::parse("SKU-1", "abc", "A", "L1", "2025-01-01"),
            Err(CoreError::UnparsableQuantity { .. })
        ));
        assert!(matches!(
            ReceiptLine::parse("SKU-1", "5", "A", "L1", "01/01/2025"),
            Err(CoreError::InvalidDate { .. })
        ));
        assert!(matches!(
            ReceiptLine::parse("", "5", "A", "L1", "2025-01-01"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_adjustment_parse() {
        let line = AdjustmentLine::parse("SKU-1", "-3", "A", "L1", "", "count").unwrap();
        assert_eq!(line.delta, -3);
        assert_eq!(line.date, None);

        let dated = AdjustmentLine::parse("SKU-1", "+2", "A", "L1", "2025-03-01", "found").unwrap();
        assert_eq!(dated.delta, 2);
        assert!(dated.date.is_some());
    }

    #[test]
    fn test_outbound_and_pick_parse() {
        let line = OutboundLine::parse("SKU-1", "8", "order 77").unwrap();
        assert_eq!(line.quantity, 8);
        assert!(OutboundLine::parse("SKU-1", "-8", "").is_err());

        // pick quantity is judged against the reservation, not here
        let pick = PickRequest::parse("RES-1", "SKU-1", "A", "L1", "0").unwrap();
        assert_eq!(pick.quantity, 0);
        assert!(PickRequest::parse(" ", "SKU-1", "A", "L1", "1").is_err());
    }

    #[test]
    fn test_return_parse() {
        let request = ReturnRequest::parse("RES-1", "SKU-1", "A", "L1", "2", "damaged box").unwrap();
        assert_eq!(request.target().reserve_id, "RES-1");
        assert_eq!(request.key(), InventoryKey::new("SKU-1", "A", "L1"));
        assert_eq!(parse_reserve_id("  RES-9 ").unwrap(), "RES-9");
        assert!(parse_reserve_id("").is_err());
    }

    #[test]
    fn test_lines_serialize_for_audit() {
        let line = OutboundLine::new("SKU-1", 3, "order");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["sku"], "SKU-1");
        assert_eq!(json["quantity"], 3);
    }
}
