//! # Id Stamps
//!
//! Correlation ids for operations and reservation ids.
//!
//! Format: `PREFIX-YYYYMMDD-HHMMSS-xxxxxxxx`, where the suffix is the first
//! eight hex digits of a random UUID v4. Two ids generated in the same
//! second differ in the suffix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix for reservation ids.
pub const RESERVATION_PREFIX: &str = "RES";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdStamp(String);

impl IdStamp {
    /// Generates a fresh stamp using the current UTC time.
    pub fn generate(prefix: &str) -> Self {
        Self::generate_at(prefix, Utc::now())
    }

    /// Generates a stamp for a given instant.
    pub fn generate_at(prefix: &str, at: DateTime<Utc>) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        IdStamp(format!(
            "{}-{}-{}",
            prefix,
            at.format("%Y%m%d-%H%M%S"),
            &uuid[..8]
        ))
    }

    /// Generates a new reservation id.
    pub fn reservation() -> Self {
        Self::generate(RESERVATION_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for IdStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdStamp {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
