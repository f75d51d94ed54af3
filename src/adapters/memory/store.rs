//! In-process document store
//!
//! Mirrors the observable write semantics of the server the repository is
//! written against: a unique `_id` index, replace-upsert counting (identical
//! replacements are matched but not modified), unordered bulk inserts that
//! report per-document rejections, and an optional per-collection document
//! validator that bulk upserts may bypass. Reads can be made to fail on
//! demand to exercise retry paths.

use super::filter;
use crate::adapters::store::{
    BulkInsertFailure, BulkInsertResult, BulkUpsertOutcome, Connector, DocumentStore,
    DocumentStream, QueryOptions, StoreResult, UpsertOutcome, WriteModel,
};
use crate::core::connection::ConnectionSettings;
use crate::domain::{StoreError, ID_FIELD};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub use crate::domain::errors::{DOCUMENT_VALIDATION_CODE, DUPLICATE_KEY_CODE};

/// Document validator: `Err(reason)` rejects the write
pub type Validator = Arc<dyn Fn(&Document) -> Result<(), String> + Send + Sync>;

/// In-memory [`DocumentStore`]
pub struct MemoryStore {
    database_name: String,
    collections: RwLock<HashMap<String, Vec<Document>>>,
    validators: RwLock<HashMap<String, Validator>>,
    pending_read_failures: AtomicUsize,
    read_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store for `database_name`
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            collections: RwLock::new(HashMap::new()),
            validators: RwLock::new(HashMap::new()),
            pending_read_failures: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
        }
    }

    /// Installs a document validator on `collection`
    pub async fn set_validator(&self, collection: &str, validator: Validator) {
        self.validators
            .write()
            .await
            .insert(collection.to_string(), validator);
    }

    /// Makes the next `count` reads fail with [`StoreError::Unavailable`]
    pub fn fail_next_reads(&self, count: usize) {
        self.pending_read_failures.store(count, Ordering::SeqCst);
    }

    /// Number of read calls received so far (failed ones included)
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of times [`DocumentStore::shutdown`] was called
    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of a collection in insertion order
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn begin_read(&self) -> StoreResult<()> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if injected {
            return Err(StoreError::Unavailable(
                "injected read failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn validator(&self, collection: &str) -> Option<Validator> {
        self.validators.read().await.get(collection).cloned()
    }
}

fn validate(validator: Option<&Validator>, document: &Document) -> StoreResult<()> {
    match validator {
        Some(check) => check(document).map_err(StoreError::DocumentValidation),
        None => Ok(()),
    }
}

fn ensure_id(document: &mut Document) -> Bson {
    if let Some(id) = document.get(ID_FIELD) {
        return id.clone();
    }
    let id = Bson::ObjectId(ObjectId::new());
    let mut with_id = Document::new();
    with_id.insert(ID_FIELD, id.clone());
    with_id.extend(std::mem::take(document));
    *document = with_id;
    id
}

fn contains_id(documents: &[Document], id: &Bson) -> bool {
    documents.iter().any(|d| d.get(ID_FIELD) == Some(id))
}

fn duplicate_key_message(database: &str, collection: &str, id: &Bson) -> String {
    format!(
        "E{DUPLICATE_KEY_CODE} duplicate key error collection: {database}.{collection} index: _id_ dup key: {{ _id: {id} }}"
    )
}

/// Replace-upsert against one collection's documents
fn replace_in(
    documents: &mut Vec<Document>,
    location: (&str, &str),
    filter_doc: &Document,
    mut replacement: Document,
) -> StoreResult<UpsertOutcome> {
    let mut position = None;
    for (index, document) in documents.iter().enumerate() {
        if filter::matches(document, filter_doc)? {
            position = Some(index);
            break;
        }
    }

    match position {
        Some(index) => {
            let existing_id = documents[index].get(ID_FIELD).cloned().unwrap_or(Bson::Null);
            replacement.remove(ID_FIELD);
            let mut updated = Document::new();
            updated.insert(ID_FIELD, existing_id);
            updated.extend(replacement);

            let modified = documents[index] != updated;
            documents[index] = updated;

            Ok(UpsertOutcome {
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
            })
        }
        None => {
            if !replacement.contains_key(ID_FIELD) {
                let literal_id = filter_doc
                    .get(ID_FIELD)
                    .filter(|v| !matches!(v, Bson::Document(_)));
                if let Some(id) = literal_id {
                    replacement.insert(ID_FIELD, id.clone());
                }
            }
            let id = ensure_id(&mut replacement);
            if contains_id(documents, &id) {
                let (database, collection) = location;
                return Err(StoreError::DuplicateKey(duplicate_key_message(
                    database, collection, &id,
                )));
            }
            documents.push(replacement);

            Ok(UpsertOutcome {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            })
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter_doc: Document) -> StoreResult<Option<Document>> {
        self.begin_read()?;
        let collections = self.collections.read().await;
        for document in collections.get(collection).into_iter().flatten() {
            if filter::matches(document, &filter_doc)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn find(
        &self,
        collection: &str,
        filter_doc: Document,
        options: QueryOptions,
    ) -> StoreResult<DocumentStream> {
        self.begin_read()?;
        let mut selected = Vec::new();
        {
            let collections = self.collections.read().await;
            for document in collections.get(collection).into_iter().flatten() {
                if filter::matches(document, &filter_doc)? {
                    selected.push(document.clone());
                }
            }
        }

        if let Some(ref spec) = options.sort {
            filter::sort_documents(&mut selected, spec);
        }

        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = match options.limit {
            Some(0) | None => usize::MAX,
            Some(n) => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };
        let projection = options.projection;

        let documents: Vec<Document> = selected
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match projection {
                Some(ref p) => filter::project(d, p),
                None => d,
            })
            .collect();

        Ok(stream::iter(documents.into_iter().map(Ok)).boxed())
    }

    async fn count(&self, collection: &str, filter_doc: Document) -> StoreResult<u64> {
        self.begin_read()?;
        let collections = self.collections.read().await;
        let mut count = 0;
        for document in collections.get(collection).into_iter().flatten() {
            if filter::matches(document, &filter_doc)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<()> {
        let validator = self.validator(collection).await;
        validate(validator.as_ref(), &document)?;

        let id = ensure_id(&mut document);
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if contains_id(documents, &id) {
            return Err(StoreError::DuplicateKey(duplicate_key_message(
                &self.database_name,
                collection,
                &id,
            )));
        }
        documents.push(document);
        Ok(())
    }

    async fn insert_many_unordered(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<BulkInsertResult> {
        let validator = self.validator(collection).await;
        let requested_count = documents.len();
        let mut failures = Vec::new();

        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();

        for (index, mut document) in documents.into_iter().enumerate() {
            let id = ensure_id(&mut document);

            let rejection = if let Err(StoreError::DocumentValidation(reason)) =
                validate(validator.as_ref(), &document)
            {
                Some((DOCUMENT_VALIDATION_CODE, format!("Document failed validation: {reason}")))
            } else if contains_id(stored, &id) {
                Some((
                    DUPLICATE_KEY_CODE,
                    duplicate_key_message(&self.database_name, collection, &id),
                ))
            } else {
                None
            };

            match rejection {
                Some((code, error)) => failures.push(BulkInsertFailure {
                    index,
                    document_id: Some(match &id {
                        Bson::ObjectId(oid) => oid.to_hex(),
                        other => other.to_string(),
                    }),
                    code: Some(code),
                    error,
                }),
                None => stored.push(document),
            }
        }

        Ok(BulkInsertResult {
            requested_count,
            inserted_count: requested_count - failures.len(),
            failures,
        })
    }

    async fn replace_upsert(
        &self,
        collection: &str,
        filter_doc: Document,
        replacement: Document,
    ) -> StoreResult<UpsertOutcome> {
        let validator = self.validator(collection).await;
        validate(validator.as_ref(), &replacement)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        replace_in(
            documents,
            (self.database_name.as_str(), collection),
            &filter_doc,
            replacement,
        )
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
        bypass_validation: bool,
    ) -> StoreResult<BulkUpsertOutcome> {
        let validator = if bypass_validation {
            None
        } else {
            self.validator(collection).await
        };

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        let mut outcome = BulkUpsertOutcome::default();

        for model in models {
            validate(validator.as_ref(), &model.replacement)?;
            let result = replace_in(
                documents,
                (self.database_name.as_str(), collection),
                &model.filter,
                model.replacement,
            )?;
            outcome.matched_count += result.matched_count;
            outcome.modified_count += result.modified_count;
            outcome.upserted_count += u64::from(result.upserted_id.is_some());
        }

        Ok(outcome)
    }

    async fn delete_one(&self, collection: &str, filter_doc: Document) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut position = None;
        for (index, document) in documents.iter().enumerate() {
            if filter::matches(document, &filter_doc)? {
                position = Some(index);
                break;
            }
        }

        Ok(match position {
            Some(index) => {
                documents.remove(index);
                1
            }
            None => 0,
        })
    }

    async fn delete_many(&self, collection: &str, filter_doc: Document) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut kept = Vec::with_capacity(documents.len());
        let mut deleted = 0;
        for document in documents.drain(..) {
            if filter::matches(&document, &filter_doc)? {
                deleted += 1;
            } else {
                kept.push(document);
            }
        }
        *documents = kept;
        Ok(deleted)
    }

    async fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// [`Connector`] handing out one shared [`MemoryStore`]
///
/// Connection strings are checked for a `mongodb://` or `mongodb+srv://`
/// scheme so construction failures behave like the real driver's.
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    connect_calls: AtomicUsize,
    pending_failures: AtomicUsize,
}

impl MemoryConnector {
    /// Wraps an existing store
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            connect_calls: AtomicUsize::new(0),
            pending_failures: AtomicUsize::new(0),
        }
    }

    /// The shared store
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Makes the next `count` connection attempts fail
    pub fn fail_next_connects(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of connection attempts so far
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> StoreResult<Arc<dyn DocumentStore>> {
        use secrecy::ExposeSecret;

        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        let uri = settings.connection_string.expose_secret();
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(StoreError::InvalidArgument(
                "connection string must start with mongodb:// or mongodb+srv://".to_string(),
            ));
        }

        if self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable(
                "injected connection failure".to_string(),
            ));
        }

        Ok(Arc::clone(&self.store) as Arc<dyn DocumentStore>)
    }
}
