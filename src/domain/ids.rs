//! Entity identifier type
//!
//! Identifiers are opaque, globally unique and compared only for equality.
//! They wrap a BSON `ObjectId` so the store can index them natively.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity identifier newtype wrapper
///
/// Serialized transparently as an `ObjectId`, so an entity field declared as
/// `#[serde(rename = "_id")] id: Option<EntityId>` maps onto the store's
/// primary key.
///
/// # Examples
///
/// ```
/// use docrepo::domain::EntityId;
/// use std::str::FromStr;
///
/// let id = EntityId::from_str("65f1a2b3c4d5e6f708192a3b").unwrap();
/// assert_eq!(id.to_string(), "65f1a2b3c4d5e6f708192a3b");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(ObjectId);

impl EntityId {
    /// Generates a fresh, globally unique identifier
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Returns the underlying `ObjectId`
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }

    /// Consumes self and returns the inner `ObjectId`
    pub fn into_inner(self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for EntityId {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<EntityId> for Bson {
    fn from(id: EntityId) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid entity id '{s}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_entity_id_from_str_invalid() {
        assert!(EntityId::from_str("not-an-object-id").is_err());
        assert!(EntityId::from_str("").is_err());
    }

    #[test]
    fn test_entity_id_serializes_as_object_id() {
        let id = EntityId::generate();
        let bson = mongodb::bson::to_bson(&id).unwrap();
        assert_eq!(bson, Bson::ObjectId(*id.as_object_id()));
    }
}
