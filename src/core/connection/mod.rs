//! Connection lifecycle
//!
//! [`ConnectionManager`] lazily builds and caches one store handle, applying
//! the fixed pool policy ([`MAX_POOL_SIZE`], [`MAX_IDLE_TIME`]) and the
//! configured server-selection timeout.

pub mod manager;
pub mod settings;

pub use manager::{ConnectionManager, ConnectionState};
pub use settings::{ConnectionSettings, MAX_IDLE_TIME, MAX_POOL_SIZE};
