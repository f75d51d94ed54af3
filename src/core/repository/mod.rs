//! Typed repository and its retry policy

pub mod repository;
pub mod retry;

pub use repository::{ModifiedCount, Repository};
pub use retry::{retry_fixed, RetryPolicy, DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS};
