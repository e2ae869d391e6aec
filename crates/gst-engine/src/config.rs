//! # Engine Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`GST_*`)
//! 2. Config file (`engine.toml`)
//! 3. Defaults (this file)
//!
//! ## Example `engine.toml`
//! ```toml
//! [database]
//! path = "/var/lib/gst-ledger/gst.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [numbering]
//! separator = "/"
//! sequence_width = 4
//!
//! [logging]
//! filter = "info,gst_db=debug"
//! ```
//!
//! Read-only after load, so no locking.

use directories::ProjectDirs;
use gst_db::DbConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "engine.toml";

/// Widest zero-padding the numbering format accepts.
pub const MAX_SEQUENCE_WIDTH: usize = 12;

// =============================================================================
// Settings
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub numbering: NumberingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// `[database]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Default: `<platform data dir>/gst.db`
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size. Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a save waits for another writer. Default: 5000 ms
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// `[numbering]` table. Prefixes live on each company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingSettings {
    /// Between prefix, financial year and sequence. Default: `/`
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Zero-padding of the sequence. Default: 4
    #[serde(default = "default_sequence_width")]
    pub sequence_width: usize,
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`. Default: `info`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_database_path() -> PathBuf {
    match ProjectDirs::from("in", "GST Ledger", "gst-ledger") {
        Some(dirs) => dirs.data_dir().join("gst.db"),
        None => PathBuf::from("gst.db"),
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_separator() -> String {
    "/".to_string()
}

fn default_sequence_width() -> usize {
    4
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for NumberingSettings {
    fn default() -> Self {
        NumberingSettings {
            separator: default_separator(),
            sequence_width: default_sequence_width(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl EngineConfig {
    /// Loads defaults, then the config file, then `GST_*` variables.
    ///
    /// An explicit `path` must exist. Without one, the platform config
    /// directory is tried and silently skipped when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => EngineConfig::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without env overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading engine config");

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses TOML text; missing tables and keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies overrides from `lookup` (normally the process environment).
    ///
    /// ## Environment Variables
    /// - `GST_DATABASE_PATH`: SQLite file
    /// - `GST_DB_MAX_CONNECTIONS`: pool size
    /// - `GST_DB_BUSY_TIMEOUT_MS`: writer wait in milliseconds
    /// - `GST_NUMBER_SEPARATOR`: numbering separator
    /// - `GST_SEQUENCE_WIDTH`: numbering zero-padding
    /// - `GST_LOG`: log filter
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("GST_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(value) = lookup("GST_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("GST_DB_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("GST_DB_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_env("GST_DB_BUSY_TIMEOUT_MS", &value)?;
        }
        if let Some(separator) = lookup("GST_NUMBER_SEPARATOR") {
            self.numbering.separator = separator;
        }
        if let Some(value) = lookup("GST_SEQUENCE_WIDTH") {
            self.numbering.sequence_width = parse_env("GST_SEQUENCE_WIDTH", &value)?;
        }
        if let Some(filter) = lookup("GST_LOG") {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database.path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=MAX_SEQUENCE_WIDTH).contains(&self.numbering.sequence_width) {
            return Err(ConfigError::InvalidValue {
                key: "numbering.sequence_width".to_string(),
                reason: format!("must be between 1 and {}", MAX_SEQUENCE_WIDTH),
            });
        }
        Ok(())
    }

    /// Pool settings for [`gst_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

/// `<platform config dir>/engine.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("in", "GST Ledger", "gst-ledger").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("cannot parse '{}'", value),
    })
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config file: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// =============================================================================
// Unit Tests
// =============================================================================
