use std::sync::Arc;

use futures::future::join_all;

use crate::models::{Listing, MatchCandidate, MatchResult, User};
use crate::services::store::{fetch, Collection, RecordStore};

/// Resolves ranked candidates into full listing and owner records
///
/// Lookups run concurrently; the output keeps the input rank order. A
/// candidate whose listing cannot be loaded is dropped, an owner that
/// cannot be loaded becomes [`User::default`]. Neither is an error.
#[derive(Clone)]
pub struct Hydrator {
    store: Arc<dyn RecordStore>,
}

impl Hydrator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn hydrate(&self, candidates: &[MatchCandidate]) -> Vec<MatchResult> {
        // join_all yields results in input order regardless of completion order
        join_all(candidates.iter().map(|candidate| self.resolve(candidate)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn resolve(&self, candidate: &MatchCandidate) -> Option<MatchResult> {
        let store = self.store.as_ref();

        let listing: Listing = match fetch(store, Collection::Posts, &candidate.listing_id).await {
            Ok(Some(listing)) => listing,
            Ok(None) => {
                tracing::debug!("Listing {} not found, dropping candidate", candidate.listing_id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to load listing {}, dropping candidate: {}", candidate.listing_id, e);
                return None;
            }
        };

        let user = match fetch::<User>(store, Collection::Users, &listing.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("Owner {} of listing {} not found", listing.user_id, listing.id);
                User::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load owner {} of listing {}: {}", listing.user_id, listing.id, e);
                User::default()
            }
        };

        Some(MatchResult {
            post: listing,
            user,
            score: candidate.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::services::store::StoreError;
    use crate::services::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn listing_json(id: &str, user_id: &str) -> Value {
        json!({
            "id": id,
            "type": "ban",
            "content": format!("listing {}", id),
            "userId": user_id,
            "createdAt": Utc::now(),
        })
    }

    fn candidate(id: &str, score: f64) -> MatchCandidate {
        MatchCandidate {
            listing_id: id.to_string(),
            score,
        }
    }

    /// Answers later for earlier-ranked ids so lookups complete in reverse
    struct SlowFirstStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl RecordStore for SlowFirstStore {
        async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
            let delay = match id {
                "p1" => 40,
                "p2" => 20,
                _ => 0,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.inner.find_by_id(collection, id).await
        }

        async fn insert(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
            self.inner.insert(collection, record).await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn find_by_id(&self, _collection: Collection, _id: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::InvalidRecord("connection reset".into()))
        }

        async fn insert(&self, _collection: Collection, _record: Value) -> Result<String, StoreError> {
            Err(StoreError::InvalidRecord("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_rank_order_survives_out_of_order_lookups() {
        let inner = MemoryStore::new();
        for id in ["p1", "p2", "p3"] {
            inner.insert(Collection::Posts, listing_json(id, "u1")).await.unwrap();
        }
        inner.insert(Collection::Users, json!({ "id": "u1", "username": "an" })).await.unwrap();

        let hydrator = Hydrator::new(Arc::new(SlowFirstStore { inner }));
        let results = hydrator
            .hydrate(&[candidate("p1", 3.0), candidate("p2", 2.0), candidate("p3", 1.0)])
            .await;

        let ids: Vec<&str> = results.iter().map(|r| r.post.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(results[0].user.username, "an");
    }

    #[tokio::test]
    async fn test_missing_listing_is_dropped() {
        let store = MemoryStore::new();
        store.insert(Collection::Posts, listing_json("p2", "u1")).await.unwrap();

        let hydrator = Hydrator::new(Arc::new(store));
        let results = hydrator.hydrate(&[candidate("p1", 2.0), candidate("p2", 1.0)]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].post.id, "p2");
        assert_eq!(results[0].post.direction, Direction::WantToSell);
    }

    #[tokio::test]
    async fn test_missing_owner_becomes_unknown_user() {
        let store = MemoryStore::new();
        store.insert(Collection::Posts, listing_json("p1", "ghost")).await.unwrap();

        let hydrator = Hydrator::new(Arc::new(store));
        let results = hydrator.hydrate(&[candidate("p1", 1.5)]).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].user.is_unknown());
        assert_eq!(results[0].score, 1.5);
    }

    #[tokio::test]
    async fn test_store_failures_are_absorbed() {
        let hydrator = Hydrator::new(Arc::new(BrokenStore));
        let results = hydrator.hydrate(&[candidate("p1", 1.0)]).await;
        assert!(results.is_empty());
    }
}
