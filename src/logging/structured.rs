//! Structured logging setup using tracing
//!
//! Console output is always on; a JSON file layer with rotation is added when
//! `logging.local_enabled` is set. Both layers stamp events with
//! [`UtcTimestamp`].

use crate::config::LoggingConfig;
use crate::domain::{RepositoryError, Result};
use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `yyyy-MM-dd hh:mm:ss tt` in UTC, e.g. `2024-03-09 04:05:06 PM`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Event timer writing UTC wall-clock time in [`TIMESTAMP_FORMAT`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcTimestamp;

impl FormatTime for UtcTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format(TIMESTAMP_FORMAT))
    }
}

/// Guard that must be kept alive for the duration of the program
/// to ensure logs are flushed properly
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            _file_guard: file_guard,
        }
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `log_level_str` when set.
///
/// # Example
///
/// ```no_run
/// use docrepo::logging::init_logging;
/// use docrepo::config::LoggingConfig;
///
/// let config = LoggingConfig::default();
/// let _guard = init_logging("info", &config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_level = parse_log_level(log_level_str)?;

    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("docrepo={}", log_level)))
    };

    let mut layers = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_timer(UtcTimestamp)
        .with_target(true)
        .with_filter(env_filter());

    layers.push(console_layer.boxed());

    let file_guard = if config.local_enabled {
        let rotation = match config.local_rotation.as_str() {
            "hourly" => Rotation::HOURLY,
            "never" => Rotation::NEVER,
            _ => Rotation::DAILY,
        };

        std::fs::create_dir_all(&config.local_path).map_err(|e| {
            RepositoryError::Configuration(format!(
                "Failed to create log directory {}: {}",
                config.local_path, e
            ))
        })?;

        let file_appender = RollingFileAppender::new(rotation, &config.local_path, "docrepo.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(UtcTimestamp)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking)
            .with_filter(env_filter());

        layers.push(file_layer.boxed());
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| RepositoryError::Configuration(format!("Logging already initialized: {e}")))?;

    tracing::info!(
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        "Logging initialized"
    );

    Ok(LoggingGuard::new(file_guard))
}

/// Parse log level from string
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(RepositoryError::Configuration(format!(
            "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
            level_str
        ))),
    }
}
