//! Store abstraction layer
//!
//! Trait-based seam between the repository core and a concrete document
//! store (MongoDB, or the in-memory store used for tests and dry runs).

pub mod models;
pub mod traits;

pub use models::{
    id_filter, BulkInsertFailure, BulkInsertResult, BulkUpsertOutcome, QueryOptions,
    UpsertOutcome, WriteModel,
};
pub use traits::{Connector, DocumentStore, DocumentStream, StoreResult};
