use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::builder::{page_offset, MatchQueryBuilder};
use crate::core::executor::SearchExecutor;
use crate::core::hydrator::Hydrator;
use crate::error::FailureClass;
use crate::models::{ListingAttributes, MatchResult};
use crate::services::classifier::{ClassifyError, Classifier};
use crate::services::search::SearchError;

/// Progress of a single match request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Received,
    Classified,
    Queried,
    Searched,
    Hydrated,
    Returned,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStage::Received => "received",
            MatchStage::Classified => "classified",
            MatchStage::Queried => "queried",
            MatchStage::Searched => "searched",
            MatchStage::Hydrated => "hydrated",
            MatchStage::Returned => "returned",
        };
        f.write_str(name)
    }
}

/// Failure of a match request, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifyError),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
}

impl MatchError {
    /// The stage that could not be reached
    pub fn stage(&self) -> MatchStage {
        match self {
            MatchError::Classification(_) => MatchStage::Classified,
            MatchError::Search(_) => MatchStage::Searched,
        }
    }

    pub fn failure_class(&self) -> FailureClass {
        match self {
            MatchError::Classification(e) => e.failure_class(),
            MatchError::Search(e) => e.failure_class(),
        }
    }
}

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Hydrated matches in descending relevance
    pub matches: Vec<MatchResult>,
    /// Raw hit count of the search backend; may exceed what can be hydrated
    pub total_match_count: u64,
    /// Listing references found on this page before hydration
    pub candidate_count: usize,
    /// What the classifier extracted from the input text
    pub attributes: ListingAttributes,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Classify the free-form text into listing attributes
/// 2. Build the counterparty query
/// 3. Execute it for the requested page
/// 4. Hydrate candidates from the system of record
///
/// Each request owns its own state; the engine can be shared freely.
#[derive(Clone)]
pub struct MatchEngine {
    classifier: Arc<dyn Classifier>,
    builder: MatchQueryBuilder,
    executor: SearchExecutor,
    hydrator: Hydrator,
}

impl MatchEngine {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        builder: MatchQueryBuilder,
        executor: SearchExecutor,
        hydrator: Hydrator,
    ) -> Self {
        Self {
            classifier,
            builder,
            executor,
            hydrator,
        }
    }

    pub fn search_enabled(&self) -> bool {
        self.executor.is_enabled()
    }

    /// Find counterparty listings for `text`
    ///
    /// Classification and search failures abort the request. Candidates that
    /// cannot be hydrated are dropped silently, so `matches` may be shorter
    /// than the page while `total_match_count` stays the backend's count.
    pub async fn find_matches(&self, text: &str, page: u32, page_size: u32) -> Result<MatchOutcome, MatchError> {
        tracing::debug!(stage = %MatchStage::Received, page, page_size, "Match request received");

        let attributes = self.classifier.classify(text).await.map_err(|e| {
            tracing::warn!(stage = %MatchStage::Classified, "Classification failed: {}", e);
            MatchError::from(e)
        })?;
        tracing::debug!(
            stage = %MatchStage::Classified,
            direction = %attributes.direction,
            price = attributes.price,
            keywords = attributes.keywords.len(),
            "Text classified"
        );

        let query = self.builder.build(&attributes);
        tracing::debug!(stage = %MatchStage::Queried, "Match query built");

        let page_result = self
            .executor
            .execute(query, page_offset(page, page_size), page_size as usize)
            .await
            .map_err(|e| {
                tracing::warn!(stage = %MatchStage::Searched, "Search failed: {}", e);
                MatchError::from(e)
            })?;
        tracing::debug!(
            stage = %MatchStage::Searched,
            total = page_result.total,
            candidates = page_result.candidates.len(),
            "Search executed"
        );

        let matches = self.hydrator.hydrate(&page_result.candidates).await;
        tracing::debug!(
            stage = %MatchStage::Hydrated,
            hydrated = matches.len(),
            dropped = page_result.candidates.len().saturating_sub(matches.len()),
            "Candidates hydrated"
        );

        tracing::info!(
            stage = %MatchStage::Returned,
            direction = %attributes.direction,
            total = page_result.total,
            returned = matches.len(),
            "Match request completed"
        );

        Ok(MatchOutcome {
            matches,
            total_match_count: page_result.total,
            candidate_count: page_result.candidates.len(),
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::SearchRequest;
    use crate::models::Direction;
    use crate::services::search::{SearchIndex, SearchResponse};
    use crate::services::{MemoryIndex, MemoryStore};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier(ListingAttributes);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<ListingAttributes, ClassifyError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> Result<ListingAttributes, ClassifyError> {
            Err(ClassifyError::ServiceError("503 Service Unavailable".into()))
        }
    }

    /// Records how often search is called
    #[derive(Default)]
    struct CountingIndex {
        searches: AtomicUsize,
    }

    #[async_trait]
    impl SearchIndex for CountingIndex {
        async fn index(&self, _id: &str, _document: &crate::models::SearchIndexDocument) -> Result<(), SearchError> {
            Ok(())
        }

        async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResponse::default())
        }

        async fn update(&self, _id: &str, _fields: Value) -> Result<(), SearchError> {
            Ok(())
        }
    }

    fn engine(classifier: Arc<dyn Classifier>, index: Option<Arc<dyn SearchIndex>>) -> MatchEngine {
        MatchEngine::new(
            classifier,
            MatchQueryBuilder::default(),
            SearchExecutor::new(index),
            Hydrator::new(Arc::new(MemoryStore::new())),
        )
    }

    #[test]
    fn test_stage_names_follow_pipeline_order() {
        let stages = [
            MatchStage::Received,
            MatchStage::Classified,
            MatchStage::Queried,
            MatchStage::Searched,
            MatchStage::Hydrated,
            MatchStage::Returned,
        ];
        let names: Vec<String> = stages.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["received", "classified", "queried", "searched", "hydrated", "returned"]);
        assert_eq!(serde_json::to_value(MatchStage::Queried).unwrap(), "queried");
    }

    #[tokio::test]
    async fn test_classification_failure_skips_search() {
        let index = Arc::new(CountingIndex::default());
        let engine = engine(Arc::new(FailingClassifier), Some(index.clone()));

        let err = engine.find_matches("bán xe", 1, 10).await.unwrap_err();

        assert_eq!(err.stage(), MatchStage::Classified);
        assert_eq!(err.failure_class(), FailureClass::Upstream);
        assert_eq!(index.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_search_fails_at_search_stage() {
        let classifier = FixedClassifier(ListingAttributes::direction_only(Direction::WantToBuy));
        let engine = engine(Arc::new(classifier), None);

        let err = engine.find_matches("mua xe", 1, 10).await.unwrap_err();

        assert_eq!(err.stage(), MatchStage::Searched);
        assert_eq!(err.failure_class(), FailureClass::Configuration);
        assert!(!engine.search_enabled());
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty_outcome() {
        let classifier = FixedClassifier(ListingAttributes::direction_only(Direction::WantToSell));
        let engine = engine(Arc::new(classifier), Some(Arc::new(MemoryIndex::new())));

        let outcome = engine.find_matches("bán điện thoại", 1, 10).await.unwrap();

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.total_match_count, 0);
        assert_eq!(outcome.attributes.direction, Direction::WantToSell);
    }
}
