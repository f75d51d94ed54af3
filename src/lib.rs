// docrepo - Typed repository layer for MongoDB
// Copyright (c) 2025 docrepo Contributors
// Licensed under the MIT License

//! # docrepo - typed repository layer for MongoDB
//!
//! docrepo gives application code a generic, typed repository over document
//! collections, backed by a lazily constructed and explicitly owned
//! connection.
//!
//! ## Overview
//!
//! - **Connecting** once per owner with a fixed pool policy and a
//!   configurable server-selection timeout
//! - **CRUD** by identifier with replace-upsert semantics
//! - **Bulk** unordered inserts with per-document rejection reports, and
//!   single-call bulk upserts
//! - **Streaming** query results lazily
//! - **Retrying** reads with a fixed delay
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Connection lifecycle and the repository
//! - [`adapters`] - Document store seam, MongoDB and in-memory stores
//! - [`domain`] - Entity trait, identifiers and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docrepo::config::DocRepoConfig;
//! use docrepo::core::connection::{ConnectionManager, ConnectionSettings};
//! use docrepo::core::repository::Repository;
//! use mongodb::bson::{doc, Document};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DocRepoConfig::from_file("docrepo.toml")?;
//!     let manager = Arc::new(ConnectionManager::mongo(ConnectionSettings::from(&config.store)));
//!
//!     let events: Repository<Document> =
//!         Repository::from_config(Arc::clone(&manager), &config).with_collection("events");
//!
//!     let saved = events.insert(doc! { "kind": "signup" }).await?;
//!     println!("stored {:?}", saved.get("_id"));
//!
//!     manager.dispose().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`domain::Result`]. Failures reported by the store
//! arrive as [`domain::RepositoryError::Store`] carrying the store's own
//! error; a missing document is `None` or `false`, never an error.
//!
//! ```rust,no_run
//! use docrepo::domain::{RepositoryError, StoreError};
//!
//! fn describe(error: &RepositoryError) -> &'static str {
//!     match error.as_store_error() {
//!         Some(StoreError::DuplicateKey(_)) => "duplicate",
//!         Some(_) => "store failure",
//!         None => "local failure",
//!     }
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
