//! Core data-access logic
//!
//! # Modules
//!
//! - [`connection`] - Lazily built, explicitly owned store handle
//! - [`repository`] - Typed CRUD, bulk, streaming and retrying reads
//!
//! # Example
//!
//! ```rust,no_run
//! use docrepo::config::load_config;
//! use docrepo::core::connection::{ConnectionManager, ConnectionSettings};
//! use docrepo::core::repository::Repository;
//! use mongodb::bson::{doc, Document};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("docrepo.toml")?;
//! let manager = Arc::new(ConnectionManager::mongo(ConnectionSettings::from(&config.store)));
//!
//! let events: Repository<Document> = Repository::from_config(Arc::clone(&manager), &config);
//! let recent = events.find_all_by_filter_with_retry(doc! { "level": "error" }).await?;
//! println!("{} matching events", recent.len());
//!
//! manager.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod repository;
