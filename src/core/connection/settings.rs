//! Connection settings and the fixed pool policy

use crate::config::{SecretString, StoreConfig};
use std::fmt;
use std::time::Duration;

/// Upper bound on pooled connections per client
pub const MAX_POOL_SIZE: u32 = 500;

/// Idle time after which a pooled connection is closed
pub const MAX_IDLE_TIME: Duration = Duration::from_secs(59);

/// Everything needed to construct a store handle
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Connection string, credentials included
    pub connection_string: SecretString,

    /// Database every repository call is bound to
    pub database_name: String,

    /// Seconds to wait for a usable server before failing an operation
    pub down_time_seconds: u64,
}

impl ConnectionSettings {
    pub fn new(
        connection_string: SecretString,
        database_name: impl Into<String>,
        down_time_seconds: u64,
    ) -> Self {
        Self {
            connection_string,
            database_name: database_name.into(),
            down_time_seconds,
        }
    }

    /// Server-selection timeout derived from the down time
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.down_time_seconds)
    }
}

impl From<&StoreConfig> for ConnectionSettings {
    fn from(config: &StoreConfig) -> Self {
        Self {
            connection_string: config.connection_string.clone(),
            database_name: config.database_name.clone(),
            down_time_seconds: config.down_time_seconds,
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use secrecy::ExposeSecret;

        f.debug_struct("ConnectionSettings")
            .field(
                "connection_string",
                &crate::config::redact_connection_string(
                    self.connection_string.expose_secret().as_ref(),
                ),
            )
            .field("database_name", &self.database_name)
            .field("down_time_seconds", &self.down_time_seconds)
            .finish()
    }
}
