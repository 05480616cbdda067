use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::core::query::{fields, Clause, SearchRequest};
use crate::models::MatchCandidate;
use crate::services::search::{SearchError, SearchHit, SearchIndex};

/// Ranked candidates of one page plus the backend's raw total
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePage {
    pub candidates: Vec<MatchCandidate>,
    /// Every matching document, including those without a listing reference
    pub total: u64,
}

/// Runs match queries against the search index
#[derive(Clone)]
pub struct SearchExecutor {
    index: Option<Arc<dyn SearchIndex>>,
}

impl SearchExecutor {
    /// `None` means no search backend is configured
    pub fn new(index: Option<Arc<dyn SearchIndex>>) -> Self {
        Self { index }
    }

    pub fn is_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// Execute `query` for the page window, in descending relevance
    ///
    /// Hits whose document carries no listing reference are left out of the
    /// candidates but still counted in `total`. A listing referenced by
    /// several documents is kept once, at its best rank.
    pub async fn execute(&self, query: Clause, from: usize, size: usize) -> Result<CandidatePage, SearchError> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| SearchError::Unavailable("search backend is not configured".to_string()))?;

        let response = index.search(&SearchRequest::new(query, from, size)).await?;

        let mut seen = HashSet::new();
        let candidates = response
            .hits
            .iter()
            .filter_map(candidate_from_hit)
            .filter(|candidate| seen.insert(candidate.listing_id.clone()))
            .collect();

        Ok(CandidatePage {
            candidates,
            total: response.total,
        })
    }
}

fn candidate_from_hit(hit: &SearchHit) -> Option<MatchCandidate> {
    let listing_id = hit
        .source
        .get(fields::POST_ID)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty());

    match listing_id {
        Some(id) => Some(MatchCandidate {
            listing_id: id.to_string(),
            score: hit.score.max(0.0),
        }),
        None => {
            tracing::debug!("Search hit {} has no listing reference, skipping", hit.id);
            None
        }
    }
}
