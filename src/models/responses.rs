use serde::{Deserialize, Serialize};

use crate::models::domain::{ChatMessage, Listing, ListingAttributes, MatchResult, SearchIndexDocument};

/// Response for find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    pub matches: Vec<MatchResult>,
    /// Raw hit count reported by the search backend
    pub total: u64,
    /// Hits on this page that referenced a listing, before hydration
    #[serde(rename = "candidateCount")]
    pub candidate_count: usize,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "postInfo")]
    pub post_info: ListingAttributes,
}

/// Response for listing creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub post: Listing,
    #[serde(rename = "postInfo")]
    pub post_info: ListingAttributes,
    /// False when classification failed and only the caller's direction was kept
    pub classified: bool,
    /// False when the listing could not be written to the search index
    pub indexed: bool,
}

/// Response for chat message creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageResponse {
    pub message: ChatMessage,
    /// False when the message could not be written to the search index
    pub indexed: bool,
}

/// Response for chat search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchChatResponse {
    pub messages: Vec<SearchIndexDocument>,
    pub total: u64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub search_enabled: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}
