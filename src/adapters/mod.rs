//! Document store integrations
//!
//! - [`store`] - The `DocumentStore` / `Connector` traits and shared models
//! - [`mongo`] - MongoDB implementation (production)
//! - [`memory`] - In-process implementation for tests and dry runs
//!
//! The core only sees `Arc<dyn DocumentStore>`; which implementation backs
//! it is decided by the [`store::Connector`] handed to the
//! `ConnectionManager`.

pub mod memory;
pub mod mongo;
pub mod store;
