//! Request and outcome types exchanged with a [`super::DocumentStore`]

use crate::domain::ID_FIELD;
use mongodb::bson::{doc, Bson, Document};

/// Paging, ordering and projection for cursor reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Documents to skip before the first result
    pub skip: Option<u64>,

    /// Maximum number of documents to return
    pub limit: Option<i64>,

    /// Sort specification, e.g. `{ "name": 1, "created": -1 }`
    pub sort: Option<Document>,

    /// Projection, e.g. `{ "name": 1 }`
    pub projection: Option<Document>,

    /// Documents fetched per round-trip
    pub batch_size: Option<u32>,
}

impl QueryOptions {
    /// Creates empty options (no paging, natural order, full documents)
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of documents to skip
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the sort specification
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the projection
    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Sets the cursor batch size
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// One upsert in a bulk write: replace the document matching `filter`, or
/// insert `replacement` when nothing matches
#[derive(Debug, Clone, PartialEq)]
pub struct WriteModel {
    /// Identifier filter, `{ "_id": <id> }`
    pub filter: Document,

    /// Full replacement document
    pub replacement: Document,

    /// Always `true` for the update family
    pub upsert: bool,
}

impl WriteModel {
    /// Builds a replace-by-id upsert model
    pub fn replace_by_id(id: impl Into<Bson>, replacement: Document) -> Self {
        Self {
            filter: id_filter(id),
            replacement,
            upsert: true,
        }
    }
}

/// Filter matching a single identifier
pub fn id_filter(id: impl Into<Bson>) -> Document {
    let id: Bson = id.into();
    doc! { ID_FIELD: id }
}

/// Outcome of a single replace-upsert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertOutcome {
    /// Documents matched by the filter (0 or 1)
    pub matched_count: u64,

    /// Documents actually changed
    pub modified_count: u64,

    /// Identifier of the inserted document when nothing matched
    pub upserted_id: Option<Bson>,
}

/// Outcome of a bulk upsert
///
/// Follows the store's counting convention: a document created through
/// upsert counts as upserted, not modified, and a replacement identical to
/// the stored document counts as matched but not modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpsertOutcome {
    /// Documents matched by a filter
    pub matched_count: u64,

    /// Documents changed by a replacement
    pub modified_count: u64,

    /// Documents inserted because nothing matched
    pub upserted_count: u64,
}

/// Result of an unordered bulk insert
#[derive(Debug, Clone, Default)]
pub struct BulkInsertResult {
    /// Number of documents submitted
    pub requested_count: usize,

    /// Number of documents persisted
    pub inserted_count: usize,

    /// Details of failed documents
    pub failures: Vec<BulkInsertFailure>,
}

impl BulkInsertResult {
    /// Number of documents that were not persisted
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// `true` when every submitted document was persisted
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.inserted_count == self.requested_count
    }
}

/// Details of a document rejected by a bulk insert
#[derive(Debug, Clone)]
pub struct BulkInsertFailure {
    /// Position in the submitted batch
    pub index: usize,

    /// Identifier of the rejected document, when it had one
    pub document_id: Option<String>,

    /// Store-reported error code, if any
    pub code: Option<i32>,

    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::new()
            .skip(10)
            .limit(5)
            .sort(doc! { "name": 1 })
            .batch_size(100);

        assert_eq!(options.skip, Some(10));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.sort, Some(doc! { "name": 1 }));
        assert_eq!(options.projection, None);
        assert_eq!(options.batch_size, Some(100));
    }

    #[test]
    fn test_replace_by_id_is_upsert() {
        let oid = ObjectId::new();
        let model = WriteModel::replace_by_id(oid, doc! { "_id": oid, "name": "x" });
        assert!(model.upsert);
        assert_eq!(model.filter, doc! { "_id": oid });
    }

    #[test]
    fn test_bulk_insert_result_success() {
        let mut result = BulkInsertResult {
            requested_count: 3,
            inserted_count: 2,
            failures: vec![BulkInsertFailure {
                index: 1,
                document_id: Some("b".to_string()),
                code: Some(11000),
                error: "duplicate key".to_string(),
            }],
        };
        assert!(!result.is_success());
        assert_eq!(result.failure_count(), 1);

        result.inserted_count = 3;
        result.failures.clear();
        assert!(result.is_success());
    }
}
