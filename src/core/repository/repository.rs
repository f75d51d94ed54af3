//! Generic repository over one collection
//!
//! Every call obtains the store handle from the shared
//! [`ConnectionManager`] and addresses the collection by name, so handles are
//! never held between calls. Store failures are returned as
//! [`RepositoryError::Store`] without being rewrapped; absence is reported as
//! `None` or `false`, never as an error.

use super::retry::{retry_fixed, RetryPolicy};
use crate::adapters::store::{
    id_filter, BulkInsertResult, DocumentStore, QueryOptions, StoreResult, WriteModel,
};
use crate::config::DocRepoConfig;
use crate::core::connection::ConnectionManager;
use crate::domain::{Entity, EntityId, RepositoryError, Result, StoreError};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::bson::{self, doc, Bson, Document};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Number of documents changed by [`Repository::update_many`]
///
/// Displays as plain decimal text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModifiedCount(pub u64);

impl ModifiedCount {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModifiedCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ModifiedCount> for u64 {
    fn from(count: ModifiedCount) -> Self {
        count.0
    }
}

/// Typed data access for entities of type `T`
///
/// # Example
///
/// ```no_run
/// use docrepo::config::secret_string;
/// use docrepo::core::connection::{ConnectionManager, ConnectionSettings};
/// use docrepo::core::repository::Repository;
/// use docrepo::domain::{Entity, EntityId};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Order {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<EntityId>,
///     total: i64,
/// }
///
/// impl Entity for Order {
///     fn id(&self) -> Option<EntityId> {
///         self.id
///     }
///     fn set_id(&mut self, id: EntityId) {
///         self.id = Some(id);
///     }
/// }
///
/// # async fn run() -> docrepo::domain::Result<()> {
/// let settings = ConnectionSettings::new(
///     secret_string("mongodb://localhost:27017".to_string()),
///     "shop",
///     30,
/// );
/// let manager = Arc::new(ConnectionManager::mongo(settings));
/// let orders: Repository<Order> = Repository::new(manager);
///
/// let saved = orders.insert(Order { id: None, total: 42 }).await?;
/// assert!(saved.id.is_some());
/// # Ok(())
/// # }
/// ```
pub struct Repository<T: Entity> {
    manager: Arc<ConnectionManager>,
    collection: String,
    retry: RetryPolicy,
    operation_timeout: Option<Duration>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            collection: self.collection.clone(),
            retry: self.retry,
            operation_timeout: self.operation_timeout,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection)
            .field("retry", &self.retry)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    /// Repository over `T`'s default collection with the default retry policy
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            collection: T::collection_name(),
            retry: RetryPolicy::default(),
            operation_timeout: None,
            _entity: PhantomData,
        }
    }

    /// Repository configured from the `[store]` and `[retry]` sections
    pub fn from_config(manager: Arc<ConnectionManager>, config: &DocRepoConfig) -> Self {
        let mut repository = Self::new(manager).with_retry_policy(RetryPolicy::from(&config.retry));

        if let Some(ref name) = config.store.collection_name {
            repository = repository.with_collection(name.clone());
        }
        if let Some(seconds) = config.store.operation_timeout_seconds {
            repository = repository.with_operation_timeout(Duration::from_secs(seconds));
        }
        repository
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Bounds every store round-trip by `timeout`
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    async fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        self.manager.ensure_connected().await
    }

    async fn bounded<R>(&self, operation: impl Future<Output = StoreResult<R>>) -> Result<R> {
        let outcome = match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| StoreError::Timeout(limit.as_millis()))?,
            None => operation.await,
        };
        Ok(outcome?)
    }

    /// Existing key of `entity`, or a freshly generated identifier
    fn identify(entity: &mut T) -> Bson {
        match entity.key() {
            Some(key) => key,
            None => {
                let id = EntityId::generate();
                entity.set_id(id);
                Bson::from(id)
            }
        }
    }

    fn require_key(&self, entity: &T) -> Result<Bson> {
        entity.key().ok_or_else(|| {
            RepositoryError::MissingIdentifier(format!(
                "cannot update a {} entity without an identifier",
                self.collection
            ))
        })
    }

    fn to_document(entity: &T) -> Result<Document> {
        Ok(bson::to_document(entity)?)
    }

    fn from_document(document: Document) -> Result<T> {
        Ok(bson::from_document(document)?)
    }

    /// Entity with the given identifier, if present
    pub async fn get_by_id(&self, id: &EntityId) -> Result<Option<T>> {
        let store = self.store().await?;
        let found = self
            .bounded(store.find_one(&self.collection, id_filter(*id)))
            .await?;
        found.map(Self::from_document).transpose()
    }

    /// Stores `entity`, generating an identifier when it has none
    ///
    /// Writes are replace-upserts keyed on the identifier, so repeating an
    /// insert leaves exactly one document.
    pub async fn insert(&self, mut entity: T) -> Result<T> {
        let key = Self::identify(&mut entity);
        self.upsert(key, &entity).await?;
        Ok(entity)
    }

    /// Replaces the stored document for `entity`, creating it if missing
    ///
    /// # Errors
    ///
    /// [`RepositoryError::MissingIdentifier`] when `entity` has no identifier.
    pub async fn update(&self, entity: T) -> Result<T> {
        let key = self.require_key(&entity)?;
        self.upsert(key, &entity).await?;
        Ok(entity)
    }

    async fn upsert(&self, key: Bson, entity: &T) -> Result<()> {
        let replacement = Self::to_document(entity)?;
        let store = self.store().await?;
        let outcome = self
            .bounded(store.replace_upsert(&self.collection, id_filter(key.clone()), replacement))
            .await?;

        tracing::debug!(
            collection = %self.collection,
            id = %key,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            upserted = outcome.upserted_id.is_some(),
            "Upserted entity"
        );
        Ok(())
    }

    /// Deletes by identifier; `true` only if exactly one document was removed
    pub async fn delete_by_id(&self, id: &EntityId) -> Result<bool> {
        let store = self.store().await?;
        let deleted = self
            .bounded(store.delete_one(&self.collection, id_filter(*id)))
            .await?;
        Ok(deleted == 1)
    }

    /// Deletes every document matching `filter`
    ///
    /// Returns `true` once the store acknowledged the delete, whether or not
    /// anything matched.
    pub async fn delete_by_filter(&self, filter: Document) -> Result<bool> {
        let store = self.store().await?;
        let deleted = self
            .bounded(store.delete_many(&self.collection, filter))
            .await?;
        tracing::debug!(collection = %self.collection, deleted = deleted, "Deleted by filter");
        Ok(true)
    }

    /// Deletes every document in the collection
    pub async fn delete_all(&self) -> Result<bool> {
        self.delete_by_filter(doc! {}).await
    }

    pub async fn find_all_by_filter(&self, filter: Document) -> Result<Vec<T>> {
        self.stream_with(filter, QueryOptions::default())
            .await?
            .try_collect()
            .await
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        self.find_all_by_filter(doc! {}).await
    }

    /// Lazy single-pass stream over the whole collection
    pub async fn stream_all(&self) -> Result<BoxStream<'static, Result<T>>> {
        self.stream_with(doc! {}, QueryOptions::default()).await
    }

    /// Lazy single-pass stream over matching documents
    ///
    /// Documents are fetched from the server in batches as the stream is
    /// polled. The operation timeout bounds opening the cursor only.
    pub async fn stream_with(
        &self,
        filter: Document,
        options: QueryOptions,
    ) -> Result<BoxStream<'static, Result<T>>> {
        let store = self.store().await?;
        let cursor = self
            .bounded(store.find(&self.collection, filter, options))
            .await?;

        Ok(cursor
            .map(|item| item.map_err(RepositoryError::from).and_then(Self::from_document))
            .boxed())
    }

    /// Unordered bulk insert into the repository's collection
    pub async fn insert_many(&self, entities: Vec<T>) -> Result<BulkInsertResult> {
        let collection = self.collection.clone();
        self.insert_many_into(entities, &collection).await
    }

    /// Unordered bulk insert into `collection`
    ///
    /// Documents rejected individually (duplicate identifier, failed
    /// validation) are reported in the result while the others are stored.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Validation`] for an empty batch; store failures of
    /// the call as a whole are returned unmodified.
    pub async fn insert_many_into(
        &self,
        entities: Vec<T>,
        collection: &str,
    ) -> Result<BulkInsertResult> {
        if entities.is_empty() {
            return Err(RepositoryError::Validation(
                "insert_many requires at least one entity".to_string(),
            ));
        }

        let documents = entities
            .into_iter()
            .map(|mut entity| {
                Self::identify(&mut entity);
                Self::to_document(&entity)
            })
            .collect::<Result<Vec<_>>>()?;

        let store = self.store().await?;
        let result = self
            .bounded(store.insert_many_unordered(collection, documents))
            .await?;

        tracing::info!(
            collection = %collection,
            requested = result.requested_count,
            inserted = result.inserted_count,
            rejected = result.failure_count(),
            "Bulk insert completed"
        );
        Ok(result)
    }

    /// Inserts one entity, subject to the collection's document validation
    ///
    /// Unlike [`Repository::insert`] this is a plain insert: an existing
    /// identifier is a duplicate key error.
    pub async fn insert_one(&self, mut entity: T) -> Result<bool> {
        Self::identify(&mut entity);
        let document = Self::to_document(&entity)?;
        let store = self.store().await?;
        self.bounded(store.insert_one(&self.collection, document))
            .await?;
        Ok(true)
    }

    /// Replace-upserts every entity in one bulk write, bypassing document
    /// validation
    ///
    /// Returns how many existing documents changed; newly created and
    /// unchanged documents are not counted.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::MissingIdentifier`] if any entity has no identifier.
    pub async fn update_many(&self, entities: Vec<T>) -> Result<ModifiedCount> {
        if entities.is_empty() {
            return Ok(ModifiedCount::default());
        }

        let models = entities
            .iter()
            .map(|entity| -> Result<WriteModel> {
                let key = self.require_key(entity)?;
                Ok(WriteModel::replace_by_id(key, Self::to_document(entity)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let store = self.store().await?;
        let outcome = self
            .bounded(store.bulk_upsert(&self.collection, models, true))
            .await?;

        tracing::info!(
            collection = %self.collection,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            upserted = outcome.upserted_count,
            "Bulk update completed"
        );
        Ok(ModifiedCount(outcome.modified_count))
    }

    /// Number of documents matching `filter`
    pub async fn count(&self, filter: Document) -> Result<u64> {
        let store = self.store().await?;
        self.bounded(store.count(&self.collection, filter)).await
    }

    /// [`Repository::find_all_by_filter`] under the retry policy
    pub async fn find_all_by_filter_with_retry(&self, filter: Document) -> Result<Vec<T>> {
        retry_fixed(&self.retry, "find_all_by_filter", || {
            self.find_all_by_filter(filter.clone())
        })
        .await
    }

    /// Whether any document matches `filter`, under the retry policy
    pub async fn exists_with_retry(&self, filter: Document) -> Result<bool> {
        retry_fixed(&self.retry, "exists", || self.exists(filter.clone())).await
    }

    async fn exists(&self, filter: Document) -> Result<bool> {
        let store = self.store().await?;
        let found = self
            .bounded(store.find_one(&self.collection, filter))
            .await?;
        Ok(found.is_some())
    }
}
