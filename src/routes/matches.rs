use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use crate::core::MatchError;
use crate::models::{ClassifyRequest, FindMatchesRequest, FindMatchesResponse, HealthResponse, Pagination};
use crate::routes::{error_response, failure_status, search_status, AppState};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches))
        .route("/nlp/classify", web::post().to(classify));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await;
    let search_enabled = state.engine.search_enabled();

    let status = if store_healthy && search_enabled { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        search_enabled,
        timestamp: chrono::Utc::now(),
    })
}

fn match_error_response(err: &MatchError) -> HttpResponse {
    let status = match err {
        MatchError::Search(e) => search_status(e),
        MatchError::Classification(e) => failure_status(e.failure_class()),
    };

    let error = match err.stage() {
        crate::core::MatchStage::Classified => "Classification failed",
        _ => "Search failed",
    };

    error_response(status, error, err)
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "content": "Cần mua xe đạp leo núi cũ tầm 1 triệu",
///   "page": 1,
///   "pageSize": 10
/// }
/// ```
async fn find_matches(state: web::Data<AppState>, req: web::Json<FindMatchesRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    let pagination = Pagination::normalize(
        req.page,
        req.page_size,
        state.matching.default_page_size,
        state.matching.max_page_size,
    );

    tracing::info!("Finding matches (page {}, size {})", pagination.page, pagination.page_size);

    match state
        .engine
        .find_matches(&req.content, pagination.page, pagination.page_size)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(FindMatchesResponse {
            matches: outcome.matches,
            total: outcome.total_match_count,
            candidate_count: outcome.candidate_count,
            page: pagination.page,
            page_size: pagination.page_size,
            post_info: outcome.attributes,
        }),
        Err(e) => {
            tracing::error!("Match request failed at {}: {}", e.stage(), e);
            match_error_response(&e)
        }
    }
}

/// Classify text without matching
///
/// POST /api/v1/nlp/classify
async fn classify(state: web::Data<AppState>, req: web::Json<ClassifyRequest>) -> impl Responder {
    if req.content.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", "content must not be empty");
    }

    match state.classifier.classify(&req.content).await {
        Ok(attributes) => HttpResponse::Ok().json(attributes),
        Err(e) => {
            tracing::error!("Classification failed: {}", e);
            error_response(failure_status(e.failure_class()), "Classification failed", e)
        }
    }
}
