//! Filter, sort and projection evaluation for the in-memory store
//!
//! Covers the subset of the query language the repository needs: implicit
//! and `$eq` equality (including array membership), `$ne`, `$gt`, `$gte`,
//! `$lt`, `$lte`, `$in`, `$nin`, `$exists`, and the logical `$and`, `$or`,
//! `$nor`. Field names may be dotted paths into embedded documents.

use crate::adapters::store::StoreResult;
use crate::domain::{StoreError, ID_FIELD};
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;

/// Returns whether `document` satisfies `filter`
///
/// # Errors
///
/// Returns [`StoreError::InvalidArgument`] for unsupported or malformed
/// operators.
pub fn matches(document: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => all_of(document, condition)?,
            "$or" => any_of(document, condition)?,
            "$nor" => !any_of(document, condition)?,
            op if op.starts_with('$') => {
                return Err(StoreError::InvalidArgument(format!(
                    "unknown top-level operator: {op}"
                )))
            }
            path => field_matches(lookup(document, path), condition)?,
        };

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses(condition: &Bson) -> StoreResult<Vec<&Document>> {
    match condition {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                Bson::Document(d) => Ok(d),
                _ => Err(StoreError::InvalidArgument(
                    "logical operator entries must be documents".to_string(),
                )),
            })
            .collect(),
        _ => Err(StoreError::InvalidArgument(
            "logical operator requires a non-empty array".to_string(),
        )),
    }
}

fn all_of(document: &Document, condition: &Bson) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if !matches(document, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_of(document: &Document, condition: &Bson) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolves a dotted path
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    let operators = match is_operator_document(condition) {
        Some(operators) => operators,
        None => return Ok(equals(value, condition)),
    };

    for (op, operand) in operators {
        let satisfied = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => ordered(value, operand, |o| o == Ordering::Greater),
            "$gte" => ordered(value, operand, |o| o != Ordering::Less),
            "$lt" => ordered(value, operand, |o| o == Ordering::Less),
            "$lte" => ordered(value, operand, |o| o != Ordering::Greater),
            "$in" => candidates(op, operand)?.iter().any(|c| equals(value, c)),
            "$nin" => !candidates(op, operand)?.iter().any(|c| equals(value, c)),
            "$exists" => value.is_some() == truthy(operand),
            other => {
                return Err(StoreError::InvalidArgument(format!(
                    "unsupported operator: {other}"
                )))
            }
        };

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn candidates<'a>(op: &str, operand: &'a Bson) -> StoreResult<&'a Vec<Bson>> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(StoreError::InvalidArgument(format!("{op} requires an array"))),
    }
}

/// Equality with array membership; a missing field equals `null`
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(actual) if same(actual, expected) => true,
        Some(Bson::Array(items)) => items.iter().any(|item| same(item, expected)),
        Some(_) => false,
    }
}

fn same(a: &Bson, b: &Bson) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| compare(item, operand).is_some_and(&accept)),
        Some(actual) => compare(actual, operand).is_some_and(accept),
        None => false,
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Orders two values of comparable types; `None` for mixed types
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Sorts documents by a `{ field: 1 | -1 }` specification
///
/// Missing fields sort before present ones, as in the server.
pub fn sort_documents(documents: &mut [Document], spec: &Document) {
    documents.sort_by(|left, right| {
        for (field, direction) in spec {
            let descending = as_number(direction).is_some_and(|d| d < 0.0);
            let ordering = match (lookup(left, field), lookup(right, field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(l), Some(r)) => compare(l, r).unwrap_or(Ordering::Equal),
            };
            let ordering = if descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Applies a top-level inclusion or exclusion projection
pub fn project(document: Document, projection: &Document) -> Document {
    let inclusive = projection.iter().any(|(field, flag)| {
        truthy(flag) && (field != ID_FIELD || projection.len() == 1)
    });

    if inclusive {
        let keep_id = projection.get(ID_FIELD).map(truthy).unwrap_or(true);
        document
            .into_iter()
            .filter(|(field, _)| {
                if field == ID_FIELD {
                    keep_id
                } else {
                    projection.get(field).is_some_and(truthy)
                }
            })
            .collect()
    } else {
        document
            .into_iter()
            .filter(|(field, _)| projection.get(field).map(truthy).unwrap_or(true))
            .collect()
    }
}
