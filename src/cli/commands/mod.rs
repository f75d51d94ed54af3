//! CLI command implementations

pub mod find;
pub mod init;
pub mod ping;
pub mod status;
pub mod validate;

use crate::adapters::memory::{MemoryConnector, MemoryStore};
use crate::config::{load_config, DocRepoConfig};
use crate::core::connection::{ConnectionManager, ConnectionSettings};
use std::sync::Arc;

/// Exit code for configuration errors
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Exit code for connection errors
pub const EXIT_CONNECTION_ERROR: i32 = 4;

/// Exit code for any other failure
pub const EXIT_FATAL: i32 = 5;

/// Loads the configuration, printing the failure for the user
pub(crate) fn load_or_report(config_path: &str) -> Option<DocRepoConfig> {
    match load_config(config_path) {
        Ok(config) => Some(config),
        Err(e) => {
            println!("❌ Failed to load configuration file: {config_path}");
            println!("   Error: {e}");
            None
        }
    }
}

/// Connection manager for the configured store, or an in-memory one
pub(crate) fn connection_manager(config: &DocRepoConfig, dry_run: bool) -> Arc<ConnectionManager> {
    let settings = ConnectionSettings::from(&config.store);
    let manager = if dry_run {
        tracing::info!("Dry run: using in-memory store");
        let store = Arc::new(MemoryStore::new(settings.database_name.clone()));
        ConnectionManager::new(settings, Arc::new(MemoryConnector::new(store)))
    } else {
        ConnectionManager::mongo(settings)
    };
    Arc::new(manager)
}
