// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ChatMessage, ChatRoom, ClassifiedFields, Direction, Listing, ListingAttributes, MatchCandidate, MatchResult,
    MessageType, SearchIndexDocument, User,
};
pub use requests::{
    ClassifyMessageRequest, ClassifyRequest, CreateMessageRequest, CreatePostRequest, FindMatchesRequest,
    IndexMessageRequest, Pagination, SearchChatQuery,
};
pub use responses::{
    AckResponse, CreateMessageResponse, CreatePostResponse, ErrorResponse, FindMatchesResponse, HealthResponse,
    SearchChatResponse,
};
