use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::query::SearchRequest;
use crate::error::FailureClass;
use crate::models::SearchIndexDocument;

/// Errors that can occur when talking to the search index
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),

    #[error("Search execution failed: {0}")]
    ExecutionError(String),
}

impl SearchError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            SearchError::Unavailable(_) => FailureClass::Configuration,
            SearchError::ExecutionError(_) => FailureClass::Upstream,
        }
    }
}

/// One ranked hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub source: Value,
}

/// A page of hits plus the exact number of matching documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total: u64,
}

/// Text-search index holding message and listing documents
///
/// Writes must be visible to the next search.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the document stored under `id`
    async fn index(&self, id: &str, document: &SearchIndexDocument) -> Result<(), SearchError>;

    /// Run a query and return the requested page of hits
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;

    /// Merge `fields` into the document stored under `id`
    async fn update(&self, id: &str, fields: Value) -> Result<(), SearchError>;
}
