use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::services::store::{identify, Collection, RecordStore, StoreError};

/// In-memory [`RecordStore`] for tests and local development
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(Collection, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|(c, _)| *c == collection)
            .count()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&(collection, id.to_string())).cloned())
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
        let (id, data) = identify(record)?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert((collection, id.clone()), data);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = MemoryStore::new();
        let id = store
            .insert(Collection::Users, json!({ "username": "an" }))
            .await
            .unwrap();

        let found = store.find_by_id(Collection::Users, &id).await.unwrap().unwrap();
        assert_eq!(found["username"], "an");
        assert_eq!(found["id"], id.as_str());
        assert_eq!(store.count(Collection::Users), 1);
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = MemoryStore::new();
        store.insert(Collection::Posts, json!({ "id": "x" })).await.unwrap();

        assert!(store.find_by_id(Collection::Users, "x").await.unwrap().is_none());
        assert!(store.find_by_id(Collection::Posts, "x").await.unwrap().is_some());
    }
}
