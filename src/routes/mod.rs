// Route exports
pub mod chat;
pub mod matches;

use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;

use crate::config::{MatchingSettings, SearchSettings};
use crate::core::{ChatIndexer, Hydrator, ListingService, MatchEngine, MatchQueryBuilder, SearchExecutor};
use crate::error::FailureClass;
use crate::models::ErrorResponse;
use crate::services::{Classifier, RecordStore, SearchError, SearchIndex};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
    pub classifier: Arc<dyn Classifier>,
    pub listings: ListingService,
    pub chat: ChatIndexer,
    pub store: Arc<dyn RecordStore>,
    pub matching: MatchingSettings,
    pub search: SearchSettings,
}

impl AppState {
    /// Wire every service from the three collaborators. `index` is `None`
    /// when no search backend is configured.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn RecordStore>,
        index: Option<Arc<dyn SearchIndex>>,
        matching: MatchingSettings,
        search: SearchSettings,
    ) -> Self {
        let engine = MatchEngine::new(
            classifier.clone(),
            MatchQueryBuilder::new((&matching.boosts).into()),
            SearchExecutor::new(index.clone()),
            Hydrator::new(store.clone()),
        );

        Self {
            engine,
            listings: ListingService::new(classifier.clone(), store.clone(), index.clone()),
            chat: ChatIndexer::new(index, store.clone()),
            classifier,
            store,
            matching,
            search,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(chat::configure),
    );
}

/// HTTP status for a failure class
pub fn failure_status(class: FailureClass) -> StatusCode {
    match class {
        FailureClass::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        FailureClass::Upstream | FailureClass::DataShape => StatusCode::BAD_GATEWAY,
    }
}

/// Search errors get 503 when the backend is missing or unreachable
pub fn search_status(err: &SearchError) -> StatusCode {
    match err {
        SearchError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::ExecutionError(_) => failure_status(err.failure_class()),
    }
}

pub(crate) fn error_response(status: StatusCode, error: &str, message: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
        status_code: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_status_mapping() {
        assert_eq!(failure_status(FailureClass::Configuration), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure_status(FailureClass::Upstream), StatusCode::BAD_GATEWAY);
        assert_eq!(failure_status(FailureClass::DataShape), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_search_status_mapping() {
        assert_eq!(
            search_status(&SearchError::Unavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            search_status(&SearchError::ExecutionError("bad query".into())),
            StatusCode::BAD_GATEWAY
        );
    }
}
