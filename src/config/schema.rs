//! Configuration schema types

use crate::config::SecretString;
use serde::{Deserialize, Serialize};

/// Root configuration, mapping one-to-one onto the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRepoConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Document store connection
    pub store: StoreConfig,

    /// Retry policy for the retry-augmented operations
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DocRepoConfig {
    /// Loads, substitutes, overrides and validates a configuration file
    ///
    /// Shorthand for [`crate::config::load_config`].
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::domain::Result<Self> {
        crate::config::load_config(path)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate()?;
        self.retry.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Document store connection settings
///
/// Pool size and idle timeout are deliberately absent: they are fixed by
/// [`crate::core::connection::MAX_POOL_SIZE`] and
/// [`crate::core::connection::MAX_IDLE_TIME`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string URI (`mongodb://` or `mongodb+srv://`)
    /// Stored securely in memory and automatically zeroized on drop
    pub connection_string: SecretString,

    /// Target database name
    pub database_name: String,

    /// Collection override; defaults to the entity type name
    #[serde(default)]
    pub collection_name: Option<String>,

    /// Server-selection timeout in seconds ("down time")
    #[serde(default = "default_down_time_seconds")]
    pub down_time_seconds: u64,

    /// Optional deadline applied to every store round-trip
    #[serde(default)]
    pub operation_timeout_seconds: Option<u64>,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        let uri = self.connection_string.expose_secret();
        if uri.is_empty() {
            return Err("store.connection_string cannot be empty".to_string());
        }

        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(
                "store.connection_string must start with mongodb:// or mongodb+srv://"
                    .to_string(),
            );
        }

        if self.database_name.trim().is_empty() {
            return Err("store.database_name cannot be empty".to_string());
        }

        if let Some(ref name) = self.collection_name {
            if name.trim().is_empty() {
                return Err("store.collection_name cannot be blank when set".to_string());
            }
        }

        if self.down_time_seconds == 0 {
            return Err("store.down_time_seconds must be > 0".to_string());
        }

        if self.operation_timeout_seconds == Some(0) {
            return Err("store.operation_timeout_seconds must be > 0 when set".to_string());
        }

        Ok(())
    }
}

/// Fixed-delay retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(format!(
                "retry.max_attempts must be between 1 and 10, got {}",
                self.max_attempts
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_down_time_seconds() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    3000
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
