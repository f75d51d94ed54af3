//! The capability every persisted type must provide

use super::ids::EntityId;
use mongodb::bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Name of the primary key field in every stored document
pub const ID_FIELD: &str = "_id";

/// A record with a unique, store-assignable identifier
///
/// The identifier is either supplied by the caller or generated on first
/// insert; once set it never changes. Implementors serialize it under
/// [`ID_FIELD`] and skip it while it is `None`:
///
/// ```
/// use docrepo::domain::{Entity, EntityId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Customer {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<EntityId>,
///     name: String,
/// }
///
/// impl Entity for Customer {
///     fn id(&self) -> Option<EntityId> {
///         self.id
///     }
///
///     fn set_id(&mut self, id: EntityId) {
///         self.id = Some(id);
///     }
/// }
///
/// assert_eq!(Customer::collection_name(), "Customer");
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Current identifier, if assigned
    fn id(&self) -> Option<EntityId>;

    /// Assigns the identifier
    fn set_id(&mut self, id: EntityId);

    /// Stored `_id` value, whatever its BSON type
    ///
    /// Writes are keyed on this value; a generated identifier is assigned
    /// only when it is `None`.
    fn key(&self) -> Option<Bson> {
        self.id().map(Bson::from)
    }

    /// Default collection for this entity type: the bare type name
    fn collection_name() -> String {
        type_name_tail(std::any::type_name::<Self>()).to_string()
    }
}

/// Strips module paths and generic arguments from a type name
fn type_name_tail(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Untyped documents, for collections without a Rust model
impl Entity for Document {
    fn id(&self) -> Option<EntityId> {
        match self.get(ID_FIELD) {
            Some(Bson::ObjectId(oid)) => Some(EntityId::from(*oid)),
            _ => None,
        }
    }

    fn set_id(&mut self, id: EntityId) {
        self.insert(ID_FIELD, Bson::from(id));
    }

    fn key(&self) -> Option<Bson> {
        match self.get(ID_FIELD) {
            None | Some(Bson::Null) => None,
            Some(id) => Some(id.clone()),
        }
    }
}
