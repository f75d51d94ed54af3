//! Logging and observability
//!
//! Structured logging through `tracing`, with UTC timestamps in
//! `yyyy-MM-dd hh:mm:ss tt` form and an optional rotating JSON file.
//!
//! # Example
//!
//! ```no_run
//! use docrepo::logging::init_logging;
//! use docrepo::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard, UtcTimestamp, TIMESTAMP_FORMAT};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use docrepo::log_error_with_context;
/// use docrepo::domain::RepositoryError;
///
/// let error = RepositoryError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use docrepo::log_retry_attempt;
///
/// log_retry_attempt!("exists", 2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($operation:expr, $attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            operation = $operation,
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
