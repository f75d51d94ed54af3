//! Domain error types
//!
//! Two layers: [`StoreError`] carries failures reported by the document store
//! exactly as the store produced them, and [`RepositoryError`] adds the
//! failures owned by this crate (configuration, connection lifecycle, input
//! preconditions). Store errors pass through the repository untouched.

use thiserror::Error;

/// Server error code for duplicate keys
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Server error code for document validation failures
pub const DOCUMENT_VALIDATION_CODE: i32 = 121;

/// Main repository error type
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The store handle could not be constructed
    #[error("Connection error: {0}")]
    Connection(#[source] StoreError),

    /// An operation was attempted after the connection was disposed
    #[error("Connection has been disposed; no further operations are allowed")]
    Disposed,

    /// An operation that needs an identifier received an entity without one
    #[error("Entity has no identifier: {0}")]
    MissingIdentifier(String),

    /// Caller input rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity <-> document conversion failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Failure reported by the document store, unmodified
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures reported by a document store
///
/// Driver errors are kept whole so callers can inspect the store-specific
/// details (error codes, labels, write errors).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Error raised by the MongoDB driver
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A document with the same unique key already exists
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The collection's document validator rejected a write
    #[error("Document failed validation: {0}")]
    DocumentValidation(String),

    /// The store rejected a single write with a code not covered above
    #[error("Write rejected with code {code}: {message}")]
    WriteRejected { code: i32, message: String },

    /// The store refused a malformed request (bad filter, bad connection string)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The operation did not finish within its deadline
    #[error("Operation timed out after {0} ms")]
    Timeout(u128),
}

impl StoreError {
    /// Classifies a server write error by its code
    pub fn from_write_error(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            DUPLICATE_KEY_CODE => StoreError::DuplicateKey(message),
            DOCUMENT_VALIDATION_CODE => StoreError::DocumentValidation(message),
            _ => StoreError::WriteRejected { code, message },
        }
    }
}

impl RepositoryError {
    /// Returns the underlying store error, if this is one
    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            RepositoryError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for RepositoryError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for RepositoryError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RepositoryError {
    fn from(err: toml::de::Error) -> Self {
        RepositoryError::Configuration(format!("TOML parse error: {err}"))
    }
}
