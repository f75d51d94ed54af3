//! `status` command

use super::{
    connection_manager, load_or_report, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_FATAL,
};
use crate::config::redact_connection_string;
use crate::core::repository::Repository;
use crate::domain::RepositoryError;
use clap::Args;
use mongodb::bson::{doc, Document};
use secrecy::ExposeSecret;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Collection to count; defaults to `store.collection_name`
    #[arg(long)]
    pub collection: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str, dry_run: bool) -> anyhow::Result<i32> {
        tracing::info!("Checking store status");

        println!("📊 Store Status");
        println!();

        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        let manager = connection_manager(&config, dry_run);
        println!(
            "  Connection: {}",
            redact_connection_string(config.store.connection_string.expose_secret().as_ref())
        );
        println!("  Database: {}", config.store.database_name);

        if let Err(e) = manager.ping().await {
            println!("  State: {}", manager.state().await);
            println!();
            println!("❌ Store unreachable");
            println!("   Error: {e}");
            manager.dispose().await;
            return Ok(EXIT_CONNECTION_ERROR);
        }
        println!("  State: {}", manager.state().await);

        let collection = self
            .collection
            .clone()
            .or_else(|| config.store.collection_name.clone());

        let code = match collection {
            Some(name) => {
                let repository: Repository<Document> =
                    Repository::from_config(manager.clone(), &config).with_collection(name.clone());
                match repository.count(doc! {}).await {
                    Ok(count) => {
                        println!("  Collection: {name} ({count} documents)");
                        0
                    }
                    Err(e @ RepositoryError::Connection(_)) => {
                        println!("❌ Failed to count documents: {e}");
                        EXIT_CONNECTION_ERROR
                    }
                    Err(e) => {
                        println!("❌ Failed to count documents: {e}");
                        EXIT_FATAL
                    }
                }
            }
            None => 0,
        };

        manager.dispose().await;
        println!();
        Ok(code)
    }
}
