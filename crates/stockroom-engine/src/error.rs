//! # Engine Errors
//!
//! Everything an operation can fail with, plus the machine-readable code
//! written into audit `error_details`.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │                                  ├──► EngineError ──► ErrorDetail      │
//! │  sqlx::Error ──────► DbError ────┘         │          {code, message}  │
//! │                                            │                           │
//! │  toml / io ────────► ConfigError ──────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;

use crate::config::ConfigError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule rejection (insufficient stock, over-pick, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Store failure. Never retried.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for EngineError {
    fn from(error: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(error))
    }
}

impl EngineError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(e) => match e {
                CoreError::InvalidQuantity { .. }
                | CoreError::UnparsableQuantity { .. }
                | CoreError::QuantityOverflow { .. } => ErrorCode::InvalidQuantity,
                CoreError::InvalidDate { .. } => ErrorCode::InvalidDate,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::NegativeQuantity { .. } => ErrorCode::NegativeQuantity,
                CoreError::RecordNotFound { .. } => ErrorCode::RecordNotFound,
                CoreError::ReservationNotFound { .. } => ErrorCode::ReservationNotFound,
                CoreError::OverPick { .. } => ErrorCode::OverPick,
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            EngineError::Store(e) if e.is_conflict() => ErrorCode::Conflict,
            EngineError::Store(_) => ErrorCode::StoreError,
            EngineError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// True for rejections caused by the request rather than the store.
    pub fn is_business(&self) -> bool {
        matches!(self, EngineError::Core(_))
    }

    /// The wrapped business error, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(e) => Some(e),
            _ => None,
        }
    }

    /// Code + message pair for audit details and caller responses.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidQuantity,
    InvalidDate,
    InsufficientStock,
    NegativeQuantity,
    RecordNotFound,
    ReservationNotFound,
    OverPick,
    ValidationError,
    Conflict,
    StoreError,
    ConfigError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidQuantity => "INVALID_QUANTITY",
            ErrorCode::InvalidDate => "INVALID_DATE",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::NegativeQuantity => "NEGATIVE_QUANTITY",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::ReservationNotFound => "RESERVATION_NOT_FOUND",
            ErrorCode::OverPick => "OVER_PICK",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::StoreError => "STORE_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&EngineError> for ErrorDetail {
    fn from(error: &EngineError) -> Self {
        error.detail()
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_codes() {
        let err: EngineError = CoreError::InsufficientStock {
            sku: "X".into(),
            requested: 100,
            available: 15,
            shortfall: 85,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert!(err.is_business());

        let err: EngineError = CoreError::from(ValidationError::Required {
            field: "sku".into(),
        })
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_field_errors_convert_directly() {
        fn check(sku: &str) -> EngineResult<()> {
            stockroom_core::validation::validate_sku(sku)?;
            Ok(())
        }

        assert!(check("SKU-1").is_ok());
        let err = check("").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.is_business());
        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));
    }

    #[test]
    fn test_store_codes() {
        let conflict: EngineError = DbError::conflict("inventory", "X/A/L1").into();
        assert_eq!(conflict.code(), ErrorCode::Conflict);
        assert!(!conflict.is_business());

        let failed: EngineError = DbError::QueryFailed("disk I/O error".into()).into();
        assert_eq!(failed.code(), ErrorCode::StoreError);
        assert!(failed.to_string().starts_with("Store error"));
    }

    #[test]
    fn test_detail_serialization() {
        let err: EngineError = CoreError::reservation_not_found("RES-1").into();
        let json = serde_json::to_value(err.detail()).unwrap();
        assert_eq!(json["code"], "RESERVATION_NOT_FOUND");
        assert!(json["message"].as_str().unwrap().contains("RES-1"));
    }

    #[test]
    fn test_code_as_str_matches_serde() {
        for code in [ErrorCode::OverPick, ErrorCode::NegativeQuantity, ErrorCode::StoreError] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
    }
}
