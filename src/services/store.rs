use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::FailureClass;

/// Errors that can occur when talking to the system of record
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            StoreError::DatabaseError(_) => FailureClass::Upstream,
            StoreError::SerializationError(_) | StoreError::InvalidRecord(_) => FailureClass::DataShape,
        }
    }
}

/// Record collections of the system of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Posts,
    Messages,
    ChatRooms,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Posts,
        Collection::Messages,
        Collection::ChatRooms,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Posts => "posts",
            Collection::Messages => "messages",
            Collection::ChatRooms => "chat_rooms",
        }
    }
}

/// Authoritative store for users, posts, messages and chat rooms
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by identity; `Ok(None)` when it does not exist
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// Insert a record and return its identity. A non-empty string `id`
    /// field on the record is used as identity, otherwise one is assigned.
    async fn insert(&self, collection: Collection, record: Value) -> Result<String, StoreError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Fetch a record and decode it into `T`
pub async fn fetch<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    id: &str,
) -> Result<Option<T>, StoreError> {
    match store.find_by_id(collection, id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode `record` and insert it
pub async fn save<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    record: &T,
) -> Result<String, StoreError> {
    store.insert(collection, serde_json::to_value(record)?).await
}

/// Split a record into its identity and stored body, assigning a fresh
/// identity when the record has none
pub(crate) fn identify(record: Value) -> Result<(String, Value), StoreError> {
    let Value::Object(mut fields) = record else {
        return Err(StoreError::InvalidRecord("record must be a JSON object".into()));
    };

    let id = match fields.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = uuid::Uuid::new_v4().to_string();
            fields.insert("id".into(), Value::String(id.clone()));
            id
        }
    };

    Ok((id, Value::Object(fields)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identify_keeps_existing_id() {
        let (id, body) = identify(json!({ "id": "p1", "content": "x" })).unwrap();
        assert_eq!(id, "p1");
        assert_eq!(body["content"], "x");
    }

    #[test]
    fn test_identify_assigns_missing_id() {
        let (id, body) = identify(json!({ "id": "", "content": "x" })).unwrap();
        assert!(!id.is_empty());
        assert_eq!(body["id"], id.as_str());
    }

    #[test]
    fn test_identify_rejects_non_objects() {
        assert!(matches!(identify(json!([1, 2])), Err(StoreError::InvalidRecord(_))));
    }

    #[test]
    fn test_collection_tables() {
        assert_eq!(Collection::ChatRooms.table(), "chat_rooms");
        assert_eq!(Collection::ALL.len(), 4);
    }
}
