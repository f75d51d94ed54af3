//! `validate-config` command

use super::{load_or_report, EXIT_CONFIG_ERROR};
use crate::config::redact_connection_string;
use crate::core::connection::{MAX_IDLE_TIME, MAX_POOL_SIZE};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading already runs validation
        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Connection: {}",
            redact_connection_string(config.store.connection_string.expose_secret().as_ref())
        );
        println!("  Database: {}", config.store.database_name);
        println!(
            "  Collection: {}",
            config
                .store
                .collection_name
                .as_deref()
                .unwrap_or("(entity default)")
        );
        println!("  Down Time: {}s", config.store.down_time_seconds);
        match config.store.operation_timeout_seconds {
            Some(seconds) => println!("  Operation Timeout: {seconds}s"),
            None => println!("  Operation Timeout: none"),
        }
        println!(
            "  Retry: {} attempts, {} ms apart",
            config.retry.max_attempts, config.retry.delay_ms
        );
        println!(
            "  Pool: max {} connections, {}s idle",
            MAX_POOL_SIZE,
            MAX_IDLE_TIME.as_secs()
        );
        println!();
        Ok(0)
    }
}
