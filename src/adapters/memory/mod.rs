//! In-memory document store
//!
//! Used by the test suites and by the CLI's `--dry-run` mode. Behaves like
//! the MongoDB store for every operation the repository issues.

pub mod filter;
pub mod store;

pub use store::{
    MemoryConnector, MemoryStore, Validator, DOCUMENT_VALIDATION_CODE, DUPLICATE_KEY_CODE,
};
