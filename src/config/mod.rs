//! Configuration management.
//!
//! TOML configuration files with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `DOCREPO_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [store]
//! connection_string = "${DOCREPO_MONGO_URI}"
//! database_name = "orders"
//! down_time_seconds = 30
//!
//! [retry]
//! max_attempts = 3
//! delay_ms = 3000
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! ```
//!
//! ```rust,no_run
//! use docrepo::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("docrepo.toml")?;
//! println!("Database: {}", config.store.database_name);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{ApplicationConfig, DocRepoConfig, LoggingConfig, RetryConfig, StoreConfig};
pub use secret::{redact_connection_string, secret_string, SecretString, SecretValue};
