//! Document store abstraction traits
//!
//! The repository layer talks to a store only through [`DocumentStore`], and
//! obtains one only through a [`Connector`]. Implementations report failures
//! as [`StoreError`] without wrapping them further.

use super::models::{
    BulkInsertResult, BulkUpsertOutcome, QueryOptions, UpsertOutcome, WriteModel,
};
use crate::core::connection::ConnectionSettings;
use crate::domain::StoreError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::Document;
use std::any::Any;
use std::sync::Arc;

/// Result type for store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Lazy, single-pass stream of documents
pub type DocumentStream = BoxStream<'static, StoreResult<Document>>;

/// Collection-level operations against one database
///
/// Every method addresses a collection by name; handles are cheap and are
/// recreated per call.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Downcast to Any for implementation-specific operations
    fn as_any(&self) -> &dyn Any;

    /// Name of the bound database
    fn database_name(&self) -> &str;

    /// Round-trip health check
    async fn ping(&self) -> StoreResult<()>;

    /// First document matching `filter`
    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    /// Cursor over every document matching `filter`
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> StoreResult<DocumentStream>;

    /// Number of documents matching `filter`
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Inserts one document, subject to document validation
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Inserts documents without ordering: a rejected document does not stop
    /// the rest. Per-document rejections are reported in the result; only
    /// failures of the call as a whole are returned as errors.
    async fn insert_many_unordered(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<BulkInsertResult>;

    /// Replaces the document matching `filter`, inserting when none matches
    async fn replace_upsert(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<UpsertOutcome>;

    /// Executes all models as a single bulk write
    async fn bulk_upsert(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
        bypass_validation: bool,
    ) -> StoreResult<BulkUpsertOutcome>;

    /// Deletes at most one matching document, returning the deleted count
    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Deletes every matching document, returning the deleted count
    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Releases network resources held by the store
    async fn shutdown(&self);
}

/// Builds a store handle from connection settings
#[async_trait]
pub trait Connector: Send + Sync {
    /// Constructs a new store handle
    ///
    /// # Errors
    ///
    /// Returns the store's own error when the settings are unusable
    /// (e.g. a malformed connection string).
    async fn connect(&self, settings: &ConnectionSettings) -> StoreResult<Arc<dyn DocumentStore>>;
}
