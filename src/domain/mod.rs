//! Domain types shared by every layer.
//!
//! # Overview
//!
//! - **Entity capability** ([`Entity`]) - what a type needs to be stored
//! - **Identifiers** ([`EntityId`])
//! - **Error types** ([`RepositoryError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, RepositoryError>`]. Absence is
//! never an error: lookups return `Option`, deletes return `bool`.
//!
//! ```rust
//! use docrepo::domain::{RepositoryError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = docrepo::config::DocRepoConfig::from_file("docrepo.toml")?;
//!     Ok(())
//! }
//! ```

pub mod entity;
pub mod errors;
pub mod ids;
pub mod result;

pub use entity::{Entity, ID_FIELD};
pub use errors::{RepositoryError, StoreError};
pub use ids::EntityId;
pub use result::Result;
