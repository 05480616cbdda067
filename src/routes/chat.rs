use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{ChatError, ListingError};
use crate::models::{
    AckResponse, ClassifyMessageRequest, CreateMessageRequest, CreateMessageResponse, CreatePostRequest,
    CreatePostResponse, IndexMessageRequest, Pagination, SearchChatQuery, SearchChatResponse,
};
use crate::routes::{error_response, failure_status, search_status, AppState};

/// Configure listing and chat routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/posts", web::post().to(create_post))
        .route("/chat/messages", web::post().to(create_message))
        .route("/chat/messages/index", web::post().to(index_message))
        .route("/chat/messages/classify", web::post().to(classify_message))
        .route("/search/chat", web::get().to(search_chat));
}

/// POST /api/v1/posts
async fn create_post(state: web::Data<AppState>, req: web::Json<CreatePostRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    match state
        .listings
        .create_listing(&req.user_id, &req.content, req.direction)
        .await
    {
        Ok(created) => HttpResponse::Created().json(CreatePostResponse {
            post: created.listing,
            post_info: created.attributes,
            classified: created.classified,
            indexed: created.indexed,
        }),
        Err(e @ ListingError::UserNotFound(_)) => error_response(StatusCode::NOT_FOUND, "User not found", e),
        Err(ListingError::Store(e)) => {
            tracing::error!("Failed to create listing for {}: {}", req.user_id, e);
            error_response(failure_status(e.failure_class()), "Failed to create post", e)
        }
    }
}

/// POST /api/v1/chat/messages
async fn create_message(state: web::Data<AppState>, req: web::Json<CreateMessageRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    match state
        .chat
        .create_message(&req.room_id, &req.sender_id, &req.content)
        .await
    {
        Ok(created) => HttpResponse::Created().json(CreateMessageResponse {
            message: created.message,
            indexed: created.indexed,
        }),
        Err(e) => {
            tracing::error!("Failed to store message in room {}: {}", req.room_id, e);
            chat_error_response(e, "Failed to create message")
        }
    }
}

/// POST /api/v1/chat/messages/index
async fn index_message(state: web::Data<AppState>, req: web::Json<IndexMessageRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    match state.chat.reindex_message(&req.message_id).await {
        Ok(_) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(e) => {
            tracing::error!("Failed to index message {}: {}", req.message_id, e);
            chat_error_response(e, "Failed to index message")
        }
    }
}

/// POST /api/v1/chat/messages/classify
async fn classify_message(state: web::Data<AppState>, req: web::Json<ClassifyMessageRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    match state.chat.classify_message(&req.message_id, &req.message_type).await {
        Ok(_) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(e @ ChatError::InvalidMessageType(_)) => error_response(
            StatusCode::BAD_REQUEST,
            "Invalid message type",
            format!("{}; expected one of: question, negotiation, agreement, inquiry, other", e),
        ),
        Err(e) => {
            tracing::error!("Failed to classify message {}: {}", req.message_id, e);
            chat_error_response(e, "Failed to classify message")
        }
    }
}

/// GET /api/v1/search/chat?q=...&page=1&pageSize=10
async fn search_chat(state: web::Data<AppState>, query: web::Query<SearchChatQuery>) -> impl Responder {
    if query.q.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing query", "q query parameter is required");
    }

    let pagination = Pagination::normalize(
        query.page,
        query.page_size,
        state.search.default_page_size,
        state.search.max_page_size,
    );

    match state.chat.search_messages(&query.q, pagination).await {
        Ok(page) => HttpResponse::Ok().json(SearchChatResponse {
            messages: page.messages,
            total: page.total,
            page: pagination.page,
            page_size: pagination.page_size,
        }),
        Err(e) => {
            tracing::error!("Chat search failed: {}", e);
            error_response(search_status(&e), "Search failed", e)
        }
    }
}

fn chat_error_response(err: ChatError, error: &str) -> HttpResponse {
    let status = match &err {
        ChatError::InvalidMessageType(_) => StatusCode::BAD_REQUEST,
        ChatError::MessageNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Search(e) => search_status(e),
        ChatError::Store(e) => failure_status(e.failure_class()),
    };
    error_response(status, error, err)
}
