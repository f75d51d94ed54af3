//! MongoDB client implementation
//!
//! Builds a driver `Client` with the fixed pool policy and exposes it through
//! [`DocumentStore`].

use super::bulk;
use crate::adapters::store::{
    BulkInsertResult, BulkUpsertOutcome, Connector, DocumentStore, DocumentStream, QueryOptions,
    StoreResult, UpsertOutcome, WriteModel,
};
use crate::core::connection::{ConnectionSettings, MAX_IDLE_TIME, MAX_POOL_SIZE};
use crate::domain::StoreError;
use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, FindOptions, Tls};
use mongodb::{Client, Collection, Database};
use std::any::Any;
use std::sync::Arc;

/// [`Connector`] producing [`MongoStore`] handles
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> StoreResult<Arc<dyn DocumentStore>> {
        let store = MongoStore::new(settings).await?;
        Ok(Arc::new(store))
    }
}

/// MongoDB-backed document store bound to one database
///
/// The driver connects lazily: construction parses and validates the
/// connection string but performs no network I/O.
pub struct MongoStore {
    /// Driver client (cheap to clone, shares the pool)
    client: Client,

    /// Bound database
    database: Database,

    /// Database name
    database_name: String,
}

impl MongoStore {
    /// Create a new MongoDB store
    ///
    /// # Errors
    ///
    /// Returns the driver error if the connection string cannot be parsed or
    /// the client cannot be built.
    pub async fn new(settings: &ConnectionSettings) -> StoreResult<Self> {
        let options = client_options(settings).await?;
        let client = Client::with_options(options)?;
        let database = client.database(&settings.database_name);

        Ok(Self {
            client,
            database,
            database_name: settings.database_name.clone(),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

    /// Underlying driver client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Parses the connection string and applies [`apply_pool_policy`]
pub async fn client_options(settings: &ConnectionSettings) -> StoreResult<ClientOptions> {
    use secrecy::ExposeSecret;

    let uri: &str = settings.connection_string.expose_secret().as_ref();
    let mut options = ClientOptions::parse(uri).await?;
    apply_pool_policy(&mut options, settings);
    Ok(options)
}

/// Applies the fixed connection policy
///
/// - max pool size [`MAX_POOL_SIZE`], idle timeout [`MAX_IDLE_TIME`]
/// - server-selection timeout from the settings' down time
/// - when TLS is enabled, server certificates are NOT verified
///
/// Certificate verification is disabled on purpose to match existing
/// deployments. Changing it needs an explicit product decision.
pub fn apply_pool_policy(options: &mut ClientOptions, settings: &ConnectionSettings) {
    options.max_pool_size = Some(MAX_POOL_SIZE);
    options.max_idle_time = Some(MAX_IDLE_TIME);
    options.server_selection_timeout = Some(settings.server_selection_timeout());

    if let Some(Tls::Enabled(ref mut tls)) = options.tls {
        tls.allow_invalid_certificates = Some(true);
    }
}

fn find_options(options: QueryOptions) -> FindOptions {
    let mut find_options = FindOptions::default();
    find_options.skip = options.skip;
    find_options.limit = options.limit;
    find_options.sort = options.sort;
    find_options.projection = options.projection;
    find_options.batch_size = options.batch_size;
    find_options
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: QueryOptions,
    ) -> StoreResult<DocumentStream> {
        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(find_options(options))
            .await?;

        Ok(cursor.map(|item| item.map_err(StoreError::from)).boxed())
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.collection(collection).insert_one(document).await?;
        Ok(())
    }

    async fn insert_many_unordered(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<BulkInsertResult> {
        bulk::insert_many_unordered(&self.collection(collection), documents).await
    }

    async fn replace_upsert(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<UpsertOutcome> {
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .upsert(true)
            .await?;

        Ok(UpsertOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
        bypass_validation: bool,
    ) -> StoreResult<BulkUpsertOutcome> {
        bulk::bulk_upsert(&self.database, collection, models, bypass_validation).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).delete_one(filter).await?.deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).delete_many(filter).await?.deleted_count)
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        tracing::debug!(database = %self.database_name, "MongoDB client shut down");
    }
}
