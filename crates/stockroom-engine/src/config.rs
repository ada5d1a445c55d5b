//! # Engine Configuration
//!
//! Configuration for the engine: where the ledger lives, inventory policy
//! knobs and the log filter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_DB_PATH=/var/lib/stockroom/ledger.db                     │
//! │     STOCKROOM_LOG=debug                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ./stockroom.toml or an explicit path                               │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockroom.toml
//! [database]
//! path = "/var/lib/stockroom/ledger.db"
//! max_connections = 8
//!
//! [inventory]
//! low_stock_threshold = 10
//! cancel_out_lot = "CANCELLED_LOT"
//! cancel_out_location = "CANCELLED_LOC"
//!
//! [logging]
//! filter = "info,stockroom=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use stockroom_core::DEFAULT_LOW_STOCK_THRESHOLD;
use stockroom_db::DbConfig;

/// Config file looked up when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "stockroom.toml";

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info,stockroom=debug,sqlx=warn";

// =============================================================================
// Errors
// =============================================================================

/// Errors while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Ledger database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Pool acquire timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stockroom.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
            run_migrations: true,
        }
    }
}

impl DatabaseSettings {
    /// Settings for an isolated in-memory ledger.
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == Path::new(":memory:")
    }

    /// Builds the pool configuration.
    pub fn to_db_config(&self) -> DbConfig {
        let base = if self.is_in_memory() {
            DbConfig::in_memory()
        } else {
            DbConfig::new(self.path.clone())
                .max_connections(self.max_connections)
                .min_connections(self.min_connections)
        };

        base.connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .run_migrations(self.run_migrations)
    }
}

// =============================================================================
// Inventory Settings
// =============================================================================

/// Inventory policy, passed to every operation through its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Per-SKU total at or below which a SKU counts as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    /// Lot used by cancel-outbound when the SKU has no record at all.
    #[serde(default = "default_cancel_out_lot")]
    pub cancel_out_lot: String,

    /// Location used by cancel-outbound when the SKU has no record at all.
    #[serde(default = "default_cancel_out_location")]
    pub cancel_out_location: String,
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

fn default_cancel_out_lot() -> String {
    "CANCELLED_LOT".to_string()
}

fn default_cancel_out_location() -> String {
    "CANCELLED_LOC".to_string()
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
            cancel_out_lot: default_cancel_out_lot(),
            cancel_out_location: default_cancel_out_location(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub inventory: InventorySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stockroom.toml` unless a path is given)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading engine config from file");
            let contents = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&contents)?
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.inventory.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "inventory.low_stock_threshold must not be negative".into(),
            ));
        }

        if self.inventory.cancel_out_lot.trim().is_empty()
            || self.inventory.cancel_out_location.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "inventory.cancel_out_lot and cancel_out_location must be set".into(),
            ));
        }

        Ok(())
    }

    /// Applies `STOCKROOM_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database path
        if let Some(path) = lookup("STOCKROOM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        // Pool size
        if let Some(max) = lookup("STOCKROOM_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid STOCKROOM_DB_MAX_CONNECTIONS"),
            }
        }

        // Log filter
        if let Some(filter) = lookup("STOCKROOM_LOG") {
            self.logging.filter = filter;
        }

        // Low stock threshold
        if let Some(threshold) = lookup("STOCKROOM_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.inventory.low_stock_threshold = t,
                Err(_) => {
                    warn!(value = %threshold, "Ignoring invalid STOCKROOM_LOW_STOCK_THRESHOLD")
                }
            }
        }

        // Cancel-outbound fallback target
        if let Some(lot) = lookup("STOCKROOM_CANCEL_OUT_LOT") {
            self.inventory.cancel_out_lot = lot;
        }
        if let Some(location) = lookup("STOCKROOM_CANCEL_OUT_LOCATION") {
            self.inventory.cancel_out_location = location;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.inventory.cancel_out_lot, "CANCELLED_LOT");
        assert_eq!(config.inventory.cancel_out_location, "CANCELLED_LOC");
        assert_eq!(config.inventory.low_stock_threshold, 10);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [database]
            path = "/tmp/ledger.db"

            [inventory]
            low_stock_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.inventory.low_stock_threshold, 3);
        assert_eq!(config.inventory.cancel_out_lot, "CANCELLED_LOT");
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = EngineConfig::from_toml_str("[database\npath = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKROOM_DB_PATH", ":memory:"),
            ("STOCKROOM_DB_MAX_CONNECTIONS", "not-a-number"),
            ("STOCKROOM_LOW_STOCK_THRESHOLD", "25"),
            ("STOCKROOM_CANCEL_OUT_LOT", "RETURNS"),
            ("STOCKROOM_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.inventory.low_stock_threshold, 25);
        assert_eq!(config.inventory.cancel_out_lot, "RETURNS");
        assert_eq!(config.inventory.cancel_out_location, "CANCELLED_LOC");
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.database.min_connections = 9;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.inventory.cancel_out_location = "  ".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.inventory.low_stock_threshold = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_db_config() {
        let db = DatabaseSettings::in_memory().to_db_config();
        assert_eq!(db.max_connections, 1);
        assert!(db.run_migrations);

        let settings = DatabaseSettings {
            max_connections: 8,
            busy_timeout_ms: 250,
            ..DatabaseSettings::default()
        };
        let db = settings.to_db_config();
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[inventory]"));
        assert!(toml_str.contains("[logging]"));
    }
}
