//! MongoDB integration
//!
//! Production [`crate::adapters::store::DocumentStore`] backed by the official
//! async driver.

pub mod bulk;
pub mod client;

pub use client::{apply_pool_policy, client_options, MongoConnector, MongoStore};
