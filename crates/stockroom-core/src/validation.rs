//! # Validation Module
//!
//! Input validation for fields coming out of the command parser.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Command parser (external)                                    │
//! │  └── splits raw text into fields                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── codes (sku / lot / location) non-empty, bounded, no whitespace    │
//! │  ├── quantities parse as integers, positive where required             │
//! │  └── dates parse as YYYY-MM-DD                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── CHECK (quantity >= 0), primary keys                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{parse_date, parse_quantity, validate_sku};
//!
//! validate_sku("SKU-001").unwrap();
//! assert_eq!(parse_quantity("12").unwrap(), 12);
//! assert!(parse_date("2025-13-01").is_err());
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::MAX_CODE_LEN;

/// Result type for field-level validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Date format accepted for inbound / adjustment dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Code Validators
// =============================================================================

fn validate_code(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a SKU.
///
/// ```rust
/// use stockroom_core::validation::validate_sku;
///
/// assert!(validate_sku("SKU-001").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_code("sku", sku)
}

/// Validates a lot code.
pub fn validate_lot(lot: &str) -> ValidationResult<()> {
    validate_code("lot", lot)
}

/// Validates a location code.
pub fn validate_location(location: &str) -> ValidationResult<()> {
    validate_code("location", location)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects zero and negative quantities.
pub fn ensure_positive(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Parses a positive integer quantity.
///
/// Non-numeric input is `UnparsableQuantity`; `0` or negatives are
/// `InvalidQuantity`.
pub fn parse_quantity(raw: &str) -> CoreResult<i64> {
    let quantity = parse_signed_quantity(raw)?;
    ensure_positive(quantity)?;
    Ok(quantity)
}

/// Parses a signed integer (adjustment delta). A leading `+` is accepted.
pub fn parse_signed_quantity(raw: &str) -> CoreResult<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| CoreError::UnparsableQuantity {
            value: trimmed.to_string(),
        })
}

// =============================================================================
// Date Validators
// =============================================================================

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> CoreResult<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| CoreError::InvalidDate {
        value: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_codes() {
        assert!(validate_sku("SKU-001").is_ok());
        assert!(validate_lot("LOT.2025/01").is_ok());
        assert!(validate_location("A-01-03").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_lot("two words").is_err());
        assert!(validate_location(&"L".repeat(MAX_CODE_LEN + 1)).is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("5").unwrap(), 5);
        assert_eq!(parse_quantity(" 12 ").unwrap(), 12);

        assert_eq!(
            parse_quantity("0").unwrap_err(),
            CoreError::InvalidQuantity { quantity: 0 }
        );
        assert_eq!(
            parse_quantity("-3").unwrap_err(),
            CoreError::InvalidQuantity { quantity: -3 }
        );
        assert!(matches!(
            parse_quantity("five"),
            Err(CoreError::UnparsableQuantity { .. })
        ));
    }

    #[test]
    fn test_parse_signed_quantity() {
        assert_eq!(parse_signed_quantity("-4").unwrap(), -4);
        assert_eq!(parse_signed_quantity("+7").unwrap(), 7);
        assert!(parse_signed_quantity("1.5").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
        assert!(matches!(
            parse_date("31/01/2025"),
            Err(CoreError::InvalidDate { .. })
        ));
        assert!(parse_date("2025-02-30").is_err());
    }
}
