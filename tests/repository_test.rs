//! Integration tests for the repository against the in-memory store

use docrepo::adapters::memory::{MemoryConnector, MemoryStore, DUPLICATE_KEY_CODE};
use docrepo::adapters::store::QueryOptions;
use docrepo::config::secret_string;
use docrepo::core::connection::{ConnectionManager, ConnectionSettings};
use docrepo::core::repository::{ModifiedCount, Repository};
use docrepo::domain::{Entity, EntityId, RepositoryError, StoreError};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,
    name: String,
    tier: String,
}

impl Customer {
    fn new(name: &str, tier: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            tier: tier.to_string(),
        }
    }

    fn with_id(mut self) -> Self {
        self.id = Some(EntityId::generate());
        self
    }
}

impl Entity for Customer {
    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

fn setup() -> (Repository<Customer>, Arc<MemoryStore>, Arc<ConnectionManager>) {
    let store = Arc::new(MemoryStore::new("shop"));
    let connector = Arc::new(MemoryConnector::new(Arc::clone(&store)));
    let settings = ConnectionSettings::new(
        secret_string("mongodb://localhost:27017".to_string()),
        "shop",
        30,
    );
    let manager = Arc::new(ConnectionManager::new(settings, connector));
    (Repository::new(Arc::clone(&manager)), store, manager)
}

fn require_tier(document: &Document) -> Result<(), String> {
    match document.get_str("tier") {
        Ok(tier) if !tier.is_empty() => Ok(()),
        _ => Err("tier must be a non-empty string".to_string()),
    }
}

#[tokio::test]
async fn test_collection_defaults_to_type_name() {
    let (repository, _, _) = setup();
    assert_eq!(repository.collection(), "Customer");
}

#[tokio::test]
async fn test_insert_generates_identifier() {
    let (repository, store, _) = setup();

    let saved = repository.insert(Customer::new("Ada", "gold")).await.unwrap();
    let id = saved.id.expect("identifier assigned");

    let loaded = repository.get_by_id(&id).await.unwrap();
    assert_eq!(loaded, Some(saved));
    assert_eq!(store.documents("Customer").await.len(), 1);
}

#[tokio::test]
async fn test_insert_keeps_supplied_identifier() {
    let (repository, _, _) = setup();
    let customer = Customer::new("Grace", "silver").with_id();
    let id = customer.id;

    let saved = repository.insert(customer).await.unwrap();
    assert_eq!(saved.id, id);
}

#[tokio::test]
async fn test_repeated_insert_is_idempotent() {
    let (repository, _, _) = setup();
    let customer = Customer::new("Ada", "gold").with_id();

    repository.insert(customer.clone()).await.unwrap();
    repository.insert(customer.clone()).await.unwrap();
    repository.insert(customer).await.unwrap();

    assert_eq!(repository.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_get_by_id_absent_is_none() {
    let (repository, _, _) = setup();
    assert_eq!(repository.get_by_id(&EntityId::generate()).await.unwrap(), None);
}

#[tokio::test]
async fn test_update_replaces_document() {
    let (repository, _, _) = setup();
    let mut saved = repository.insert(Customer::new("Ada", "gold")).await.unwrap();

    saved.tier = "platinum".to_string();
    repository.update(saved.clone()).await.unwrap();

    let id = saved.id.unwrap();
    let loaded = repository.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(loaded.tier, "platinum");
    assert_eq!(repository.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_without_identifier_fails() {
    let (repository, _, _) = setup();
    let err = repository
        .update(Customer::new("Ada", "gold"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::MissingIdentifier(_)));
}

#[tokio::test]
async fn test_update_of_unknown_identifier_creates() {
    let (repository, _, _) = setup();
    let customer = Customer::new("Linus", "bronze").with_id();
    let id = customer.id.unwrap();

    repository.update(customer).await.unwrap();
    assert!(repository.get_by_id(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_by_id_reports_accurately() {
    let (repository, _, _) = setup();
    let saved = repository.insert(Customer::new("Ada", "gold")).await.unwrap();
    let id = saved.id.unwrap();

    assert!(repository.delete_by_id(&id).await.unwrap());
    assert!(!repository.delete_by_id(&id).await.unwrap());
    assert!(!repository.delete_by_id(&EntityId::generate()).await.unwrap());
}

#[tokio::test]
async fn test_delete_by_filter_and_all() {
    let (repository, _, _) = setup();
    for (name, tier) in [("a", "gold"), ("b", "gold"), ("c", "silver")] {
        repository.insert(Customer::new(name, tier)).await.unwrap();
    }

    assert!(repository.delete_by_filter(doc! { "tier": "gold" }).await.unwrap());
    assert_eq!(repository.count(doc! {}).await.unwrap(), 1);

    // Nothing matches, still acknowledged
    assert!(repository.delete_by_filter(doc! { "tier": "gold" }).await.unwrap());

    assert!(repository.delete_all().await.unwrap());
    assert!(repository.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_all_by_filter() {
    let (repository, _, _) = setup();
    for (name, tier) in [("a", "gold"), ("b", "silver"), ("c", "gold")] {
        repository.insert(Customer::new(name, tier)).await.unwrap();
    }

    let gold = repository
        .find_all_by_filter(doc! { "tier": "gold" })
        .await
        .unwrap();
    let mut names: Vec<_> = gold.into_iter().map(|c| c.name).collect();
    names.sort();
    assert_eq!(names, vec!["a", "c"]);

    assert_eq!(repository.find_all().await.unwrap().len(), 3);
    assert!(repository
        .find_all_by_filter(doc! { "tier": "none" })
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_stream_with_options() {
    let (repository, _, _) = setup();
    for name in ["d", "b", "a", "c"] {
        repository.insert(Customer::new(name, "gold")).await.unwrap();
    }

    let options = QueryOptions::new().sort(doc! { "name": 1 }).skip(1).limit(2);
    let streamed: Vec<Customer> = repository
        .stream_with(doc! {}, options)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let names: Vec<_> = streamed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);

    let all: Vec<Customer> = repository
        .stream_all()
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_insert_many_tolerates_duplicates() {
    let (repository, store, _) = setup();
    let a = Customer::new("A", "gold").with_id();
    let b = Customer::new("B", "gold").with_id();
    let c = Customer::new("C", "gold").with_id();

    repository.insert(b.clone()).await.unwrap();

    let result = repository
        .insert_many(vec![a.clone(), b.clone(), c.clone()])
        .await
        .unwrap();

    assert_eq!(result.requested_count, 3);
    assert_eq!(result.inserted_count, 2);
    assert!(!result.is_success());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].index, 1);
    assert_eq!(result.failures[0].code, Some(DUPLICATE_KEY_CODE));
    assert_eq!(
        result.failures[0].document_id,
        b.id.map(|id| id.to_string())
    );

    for customer in [&a, &b, &c] {
        let id = customer.id.unwrap();
        assert!(repository.get_by_id(&id).await.unwrap().is_some());
    }
    assert_eq!(store.documents("Customer").await.len(), 3);
}

#[tokio::test]
async fn test_insert_many_assigns_identifiers() {
    let (repository, _, _) = setup();
    let result = repository
        .insert_many(vec![Customer::new("x", "gold"), Customer::new("y", "gold")])
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.inserted_count, 2);
    assert!(repository
        .find_all()
        .await
        .unwrap()
        .iter()
        .all(|c| c.id.is_some()));
}

#[tokio::test]
async fn test_insert_many_into_named_collection() {
    let (repository, store, _) = setup();
    repository
        .insert_many_into(vec![Customer::new("x", "gold")], "archive")
        .await
        .unwrap();

    assert_eq!(store.documents("archive").await.len(), 1);
    assert!(store.documents("Customer").await.is_empty());
}

#[tokio::test]
async fn test_insert_many_rejects_empty_batch() {
    let (repository, _, _) = setup();
    let err = repository.insert_many(Vec::new()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)));
}

#[tokio::test]
async fn test_insert_one_propagates_validation_failure() {
    let (repository, store, _) = setup();
    store.set_validator("Customer", Arc::new(require_tier)).await;

    assert!(repository
        .insert_one(Customer::new("ok", "gold"))
        .await
        .unwrap());

    let err = repository
        .insert_one(Customer::new("bad", ""))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_store_error(),
        Some(StoreError::DocumentValidation(_))
    ));
    assert_eq!(repository.count(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_one_duplicate_is_store_error() {
    let (repository, _, _) = setup();
    let customer = Customer::new("Ada", "gold").with_id();
    repository.insert_one(customer.clone()).await.unwrap();

    let err = repository.insert_one(customer).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Store(StoreError::DuplicateKey(_))
    ));
}

#[tokio::test]
async fn test_update_many_counts_modified_documents() {
    let (repository, _, _) = setup();
    let a = repository.insert(Customer::new("A", "gold")).await.unwrap();
    let b = repository.insert(Customer::new("B", "gold")).await.unwrap();

    let mut changed = a.clone();
    changed.tier = "platinum".to_string();

    let count = repository.update_many(vec![changed, b]).await.unwrap();
    assert_eq!(count, ModifiedCount(1));
    assert_eq!(count.to_string(), "1");

    let id = a.id.unwrap();
    let loaded = repository.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(loaded.tier, "platinum");
}

#[tokio::test]
async fn test_update_many_upserts_without_counting() {
    let (repository, _, _) = setup();
    let fresh = Customer::new("new", "gold").with_id();

    let count = repository.update_many(vec![fresh.clone()]).await.unwrap();
    assert_eq!(count.to_string(), "0");

    let id = fresh.id.unwrap();
    assert!(repository.get_by_id(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_update_many_mixed_batch_counts_only_existing() {
    let (_, store, manager) = setup();
    let people: Repository<Document> = Repository::new(manager).with_collection("people");
    people.insert(doc! { "_id": 1, "name": "a" }).await.unwrap();

    let count = people
        .update_many(vec![
            doc! { "_id": 1, "name": "x" },
            doc! { "_id": 2, "name": "y" },
        ])
        .await
        .unwrap();

    assert_eq!(count.to_string(), "1");
    assert!(people.exists_with_retry(doc! { "_id": 2, "name": "y" }).await.unwrap());
    assert_eq!(
        store.documents("people").await,
        vec![
            doc! { "_id": 1, "name": "x" },
            doc! { "_id": 2, "name": "y" },
        ]
    );
}

#[tokio::test]
async fn test_insert_keeps_caller_supplied_string_id() {
    let (_, _, manager) = setup();
    let people: Repository<Document> = Repository::new(manager).with_collection("people");

    let first = people.insert(doc! { "_id": "abc", "n": 1 }).await.unwrap();
    let second = people.insert(doc! { "_id": "abc", "n": 2 }).await.unwrap();

    assert_eq!(first.get_str("_id").unwrap(), "abc");
    assert_eq!(second.get_str("_id").unwrap(), "abc");
    assert_eq!(people.count(doc! {}).await.unwrap(), 1);

    let stored = people.find_all().await.unwrap();
    assert_eq!(stored, vec![doc! { "_id": "abc", "n": 2 }]);
}

#[tokio::test]
async fn test_update_many_bypasses_document_validation() {
    let (repository, store, _) = setup();
    let saved = repository.insert(Customer::new("A", "gold")).await.unwrap();
    store.set_validator("Customer", Arc::new(require_tier)).await;

    let mut invalid = saved.clone();
    invalid.tier = String::new();

    let count = repository.update_many(vec![invalid]).await.unwrap();
    assert_eq!(count.get(), 1);
}

#[tokio::test]
async fn test_update_many_requires_identifiers() {
    let (repository, _, _) = setup();
    let err = repository
        .update_many(vec![Customer::new("A", "gold")])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::MissingIdentifier(_)));
}

#[tokio::test]
async fn test_repositories_share_one_connection() {
    let store = Arc::new(MemoryStore::new("shop"));
    let connector = Arc::new(MemoryConnector::new(Arc::clone(&store)));
    let settings = ConnectionSettings::new(secret_string("mongodb://h".to_string()), "shop", 5);
    let manager = Arc::new(ConnectionManager::new(settings, connector.clone()));

    let customers: Repository<Customer> = Repository::new(Arc::clone(&manager));
    let raw: Repository<Document> =
        Repository::new(Arc::clone(&manager)).with_collection("Customer");

    customers.insert(Customer::new("Ada", "gold")).await.unwrap();
    let documents = raw.find_all().await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].get_str("name").unwrap(), "Ada");
    assert_eq!(connector.connect_calls(), 1);
}

#[tokio::test]
async fn test_operations_after_dispose_fail() {
    let (repository, _, manager) = setup();
    repository.insert(Customer::new("Ada", "gold")).await.unwrap();

    assert!(manager.dispose().await);

    let err = repository.find_all().await.unwrap_err();
    assert!(matches!(err, RepositoryError::Disposed));
}
