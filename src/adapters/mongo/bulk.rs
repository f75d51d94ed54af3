//! Bulk operations for MongoDB
//!
//! Unordered inserts report per-document rejections instead of failing the
//! whole batch. Upserts go out as `update` commands carrying every statement,
//! which every supported server version accepts.

use crate::adapters::store::{
    BulkInsertFailure, BulkInsertResult, BulkUpsertOutcome, StoreResult, WriteModel,
};
use crate::domain::{StoreError, ID_FIELD};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, IndexedWriteError, InsertManyError, WriteConcernError};
use mongodb::{Collection, Database};
use serde::Deserialize;

/// Statements per `update` command (the server's `maxWriteBatchSize`)
pub(crate) const MAX_WRITE_BATCH: usize = 100_000;

/// Inserts documents with `ordered: false`
///
/// Documents rejected individually (duplicate key, validation) are listed in
/// the result; the others are persisted. Any other failure, including a
/// write concern error, is returned unmodified.
pub(crate) async fn insert_many_unordered(
    collection: &Collection<Document>,
    documents: Vec<Document>,
) -> StoreResult<BulkInsertResult> {
    let requested_count = documents.len();
    let document_ids: Vec<Option<String>> = documents
        .iter()
        .map(|d| d.get(ID_FIELD).map(display_id))
        .collect();

    match collection.insert_many(documents).ordered(false).await {
        Ok(result) => Ok(BulkInsertResult {
            requested_count,
            inserted_count: result.inserted_ids.len(),
            failures: Vec::new(),
        }),
        Err(e) => {
            let failures = match e.kind.as_ref() {
                ErrorKind::InsertMany(failure) => match insert_failures(failure, &document_ids) {
                    Some(failures) => failures,
                    None => return Err(e.into()),
                },
                _ => return Err(e.into()),
            };

            tracing::warn!(
                collection = %collection.name(),
                requested = requested_count,
                rejected = failures.len(),
                "Unordered insert completed with rejected documents"
            );

            Ok(BulkInsertResult {
                requested_count,
                inserted_count: requested_count.saturating_sub(failures.len()),
                failures,
            })
        }
    }
}

/// Per-document rejections of an unordered insert
///
/// `None` when the batch also failed its write concern; that failure belongs
/// to the call as a whole.
fn insert_failures(
    failure: &InsertManyError,
    document_ids: &[Option<String>],
) -> Option<Vec<BulkInsertFailure>> {
    if failure.write_concern_error.is_some() {
        return None;
    }

    Some(
        failure
            .write_errors
            .iter()
            .flatten()
            .map(|w| BulkInsertFailure {
                index: w.index,
                document_id: document_ids.get(w.index).cloned().flatten(),
                code: Some(w.code),
                error: w.message.clone(),
            })
            .collect(),
    )
}

/// Replace-upserts every model in `collection`
///
/// Counts follow the server: upserted documents are not counted as modified.
pub(crate) async fn bulk_upsert(
    database: &Database,
    collection: &str,
    models: Vec<WriteModel>,
    bypass_validation: bool,
) -> StoreResult<BulkUpsertOutcome> {
    let mut outcome = BulkUpsertOutcome::default();

    for batch in models.chunks(MAX_WRITE_BATCH) {
        let reply = database
            .run_command(update_command(collection, batch, bypass_validation))
            .await?;
        let counts = update_outcome(reply)?;

        outcome.matched_count += counts.matched_count;
        outcome.modified_count += counts.modified_count;
        outcome.upserted_count += counts.upserted_count;
    }
    Ok(outcome)
}

fn update_command(collection: &str, models: &[WriteModel], bypass_validation: bool) -> Document {
    let updates: Vec<Bson> = models
        .iter()
        .map(|m| {
            Bson::Document(doc! {
                "q": m.filter.clone(),
                "u": m.replacement.clone(),
                "upsert": m.upsert,
                "multi": false,
            })
        })
        .collect();

    let mut command = doc! {
        "update": collection,
        "updates": updates,
        "ordered": true,
    };
    if bypass_validation {
        command.insert("bypassDocumentValidation", true);
    }
    command
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateReply {
    n: i64,
    n_modified: i64,
    upserted: Vec<Document>,
    write_errors: Vec<IndexedWriteError>,
    write_concern_error: Option<WriteConcernError>,
}

/// Reads the counts out of an `update` reply
///
/// `n` covers matched and upserted statements together. A reply carrying a
/// write error or a write concern error fails with the first such error.
fn update_outcome(reply: Document) -> StoreResult<BulkUpsertOutcome> {
    let reply: UpdateReply = bson::from_document(reply).map_err(mongodb::error::Error::from)?;

    if let Some(w) = reply.write_errors.first() {
        return Err(StoreError::from_write_error(w.code, w.message.clone()));
    }
    if let Some(w) = reply.write_concern_error {
        return Err(StoreError::WriteRejected {
            code: w.code,
            message: w.message,
        });
    }

    let upserted_count = reply.upserted.len() as u64;
    Ok(BulkUpsertOutcome {
        matched_count: non_negative(reply.n).saturating_sub(upserted_count),
        modified_count: non_negative(reply.n_modified),
        upserted_count,
    })
}

fn non_negative(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn display_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn insert_many_error(reply: Document) -> InsertManyError {
        bson::from_document(reply).unwrap()
    }

    #[test]
    fn test_display_id() {
        let oid = ObjectId::new();
        assert_eq!(display_id(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(display_id(&Bson::String("a".to_string())), "a");
        assert_eq!(display_id(&Bson::Int32(7)), "7");
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative(3), 3);
        assert_eq!(non_negative(-1), 0);
    }

    #[test]
    fn test_insert_failures_map_index_to_document_id() {
        let failure = insert_many_error(doc! {
            "writeErrors": [
                { "index": 1, "code": 11000, "errmsg": "E11000 duplicate key" },
                { "index": 3, "code": 121, "errmsg": "Document failed validation" },
            ],
        });
        let ids = vec![
            Some("a".to_string()),
            Some("b".to_string()),
            Some("c".to_string()),
            None,
        ];

        let failures = insert_failures(&failure, &ids).unwrap();

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].document_id.as_deref(), Some("b"));
        assert_eq!(failures[0].code, Some(11000));
        assert_eq!(failures[0].error, "E11000 duplicate key");
        assert_eq!(failures[1].index, 3);
        assert_eq!(failures[1].document_id, None);
        assert_eq!(failures[1].code, Some(121));
    }

    #[test]
    fn test_insert_failures_index_out_of_range_has_no_id() {
        let failure = insert_many_error(doc! {
            "writeErrors": [{ "index": 9, "code": 11000, "errmsg": "dup" }],
        });
        let failures = insert_failures(&failure, &[Some("a".to_string())]).unwrap();
        assert_eq!(failures[0].document_id, None);
    }

    #[test]
    fn test_insert_failures_write_concern_error_fails_whole_call() {
        let failure = insert_many_error(doc! {
            "writeErrors": [{ "index": 0, "code": 11000, "errmsg": "dup" }],
            "writeConcernError": { "code": 64, "codeName": "WriteConcernFailed", "errmsg": "timeout" },
        });
        assert!(insert_failures(&failure, &[Some("a".to_string())]).is_none());
    }

    #[test]
    fn test_update_command_shape() {
        let models = vec![
            WriteModel::replace_by_id(1, doc! { "_id": 1, "name": "x" }),
            WriteModel::replace_by_id(2, doc! { "_id": 2, "name": "y" }),
        ];

        let command = update_command("people", &models, true);

        assert_eq!(command.get_str("update").unwrap(), "people");
        assert!(command.get_bool("bypassDocumentValidation").unwrap());
        let updates = command.get_array("updates").unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[0],
            Bson::Document(doc! {
                "q": { "_id": 1 },
                "u": { "_id": 1, "name": "x" },
                "upsert": true,
                "multi": false,
            })
        );
    }

    #[test]
    fn test_update_command_without_bypass() {
        let models = vec![WriteModel::replace_by_id(1, doc! { "_id": 1 })];
        let command = update_command("people", &models, false);
        assert!(!command.contains_key("bypassDocumentValidation"));
    }

    #[test]
    fn test_update_outcome_separates_upserts() {
        let outcome = update_outcome(doc! {
            "n": 2,
            "nModified": 1,
            "upserted": [{ "index": 1, "_id": 2 }],
            "ok": 1.0,
        })
        .unwrap();

        assert_eq!(
            outcome,
            BulkUpsertOutcome {
                matched_count: 1,
                modified_count: 1,
                upserted_count: 1,
            }
        );
    }

    #[test]
    fn test_update_outcome_without_upserts() {
        let outcome = update_outcome(doc! { "n": 3, "nModified": 0, "ok": 1.0 }).unwrap();
        assert_eq!(outcome.matched_count, 3);
        assert_eq!(outcome.modified_count, 0);
        assert_eq!(outcome.upserted_count, 0);
    }

    #[test]
    fn test_update_outcome_write_error() {
        let err = update_outcome(doc! {
            "n": 0,
            "nModified": 0,
            "writeErrors": [{ "index": 0, "code": 11000, "errmsg": "E11000 duplicate key" }],
            "ok": 1.0,
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
    }

    #[test]
    fn test_update_outcome_write_concern_error() {
        let err = update_outcome(doc! {
            "n": 1,
            "nModified": 1,
            "writeConcernError": { "code": 64, "errmsg": "waiting for replication timed out" },
            "ok": 1.0,
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected { code: 64, .. }));
    }
}
