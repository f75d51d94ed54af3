//! `ping` command

use super::{connection_manager, load_or_report, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR};
use clap::Args;
use std::time::Instant;

/// Arguments for the ping command
#[derive(Args, Debug)]
pub struct PingArgs {}

impl PingArgs {
    /// Execute the ping command
    pub async fn execute(&self, config_path: &str, dry_run: bool) -> anyhow::Result<i32> {
        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        let manager = connection_manager(&config, dry_run);
        let started = Instant::now();
        let outcome = manager.ping().await;
        manager.dispose().await;

        match outcome {
            Ok(()) => {
                println!(
                    "✅ {} reachable ({} ms)",
                    config.store.database_name,
                    started.elapsed().as_millis()
                );
                Ok(0)
            }
            Err(e) => {
                crate::log_error_with_context!(e, "Ping failed");
                println!("❌ Store unreachable");
                println!("   Error: {e}");
                Ok(EXIT_CONNECTION_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_ping_dry_run() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
connection_string = "mongodb://localhost:27017"
database_name = "app"
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        assert_eq!(PingArgs {}.execute(&path, true).await.unwrap(), 0);
    }
}
