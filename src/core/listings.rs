use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::FailureClass;
use crate::models::{Direction, Listing, ListingAttributes, SearchIndexDocument, User};
use crate::services::classifier::Classifier;
use crate::services::search::{SearchError, SearchIndex};
use crate::services::store::{fetch, save, Collection, RecordStore, StoreError};

/// Errors that can occur when creating a listing
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ListingError {
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            ListingError::UserNotFound(_) => None,
            ListingError::Store(e) => Some(e.failure_class()),
        }
    }
}

/// A stored listing and how far it got through enrichment
#[derive(Debug, Clone)]
pub struct CreatedListing {
    pub listing: Listing,
    pub attributes: ListingAttributes,
    /// The classifier contributed structured fields
    pub classified: bool,
    /// The listing is searchable by the matching pipeline
    pub indexed: bool,
}

/// Creates listings and makes them matchable
#[derive(Clone)]
pub struct ListingService {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn RecordStore>,
    index: Option<Arc<dyn SearchIndex>>,
}

impl ListingService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn RecordStore>,
        index: Option<Arc<dyn SearchIndex>>,
    ) -> Self {
        Self {
            classifier,
            store,
            index,
        }
    }

    /// Create a listing for an existing user
    ///
    /// Classification and indexing are best effort: a listing is stored even
    /// when either fails, with `classified`/`indexed` reporting the outcome.
    /// The caller's `direction` always wins over the classifier's.
    pub async fn create_listing(
        &self,
        user_id: &str,
        content: &str,
        direction: Direction,
    ) -> Result<CreatedListing, ListingError> {
        let user: Option<User> = fetch(self.store.as_ref(), Collection::Users, user_id).await?;
        if user.is_none() {
            return Err(ListingError::UserNotFound(user_id.to_string()));
        }

        // Structured fields come from the classifier, the direction from the caller
        let (attributes, classified) = match self.classifier.classify_fields(content).await {
            Ok(fields) => (fields.with_direction(direction), true),
            Err(e) => {
                tracing::warn!("Classification failed for new listing of {}, storing unclassified: {}", user_id, e);
                (ListingAttributes::direction_only(direction), false)
            }
        };

        let listing = Listing::new(
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            content.to_string(),
            direction,
            attributes.clone(),
            Utc::now(),
        );
        save(self.store.as_ref(), Collection::Posts, &listing).await?;
        tracing::info!("Created listing {} ({}) for user {}", listing.id, listing.direction, user_id);

        let indexed = match self.index_listing(&listing).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Listing {} stored but not indexed: {}", listing.id, e);
                false
            }
        };

        Ok(CreatedListing {
            listing,
            attributes,
            classified,
            indexed,
        })
    }

    async fn index_listing(&self, listing: &Listing) -> Result<(), SearchError> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| SearchError::Unavailable("search backend is not configured".to_string()))?;
        index.index(&listing.id, &SearchIndexDocument::for_listing(listing)).await
    }
}
