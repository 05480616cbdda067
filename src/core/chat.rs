use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::core::query::{fields, Clause, SearchRequest, SortOrder};
use crate::models::{ChatMessage, ChatRoom, Listing, MessageType, Pagination, SearchIndexDocument};
use crate::services::search::{SearchError, SearchIndex};
use crate::services::store::{fetch, save, Collection, RecordStore, StoreError};

/// Errors of chat indexing operations
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Newest-first page of chat search results
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<SearchIndexDocument>,
    pub total: u64,
}

/// A stored message and whether it reached the search index
#[derive(Debug, Clone)]
pub struct CreatedMessage {
    pub message: ChatMessage,
    pub indexed: bool,
}

/// Keeps chat messages searchable and tagged
#[derive(Clone)]
pub struct ChatIndexer {
    index: Option<Arc<dyn SearchIndex>>,
    store: Arc<dyn RecordStore>,
}

impl ChatIndexer {
    pub fn new(index: Option<Arc<dyn SearchIndex>>, store: Arc<dyn RecordStore>) -> Self {
        Self { index, store }
    }

    fn index(&self) -> Result<&Arc<dyn SearchIndex>, SearchError> {
        self.index
            .as_ref()
            .ok_or_else(|| SearchError::Unavailable("search backend is not configured".to_string()))
    }

    /// Store a new message, then index it. Indexing is best effort.
    pub async fn create_message(
        &self,
        room_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<CreatedMessage, ChatError> {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        save(self.store.as_ref(), Collection::Messages, &message).await?;
        tracing::info!("Stored message {} in room {}", message.id, message.room_id);

        let indexed = match self.index_message(&message).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Message {} stored but not indexed: {}", message.id, e);
                false
            }
        };

        Ok(CreatedMessage { message, indexed })
    }

    /// Index a stored message again, e.g. after its room or post changed
    pub async fn reindex_message(&self, message_id: &str) -> Result<SearchIndexDocument, ChatError> {
        let message: ChatMessage = fetch(self.store.as_ref(), Collection::Messages, message_id)
            .await?
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))?;

        Ok(self.index_message(&message).await?)
    }

    /// Index a message with the room and post context found in the store.
    /// A room or post that cannot be read leaves that context unknown.
    pub async fn index_message(&self, message: &ChatMessage) -> Result<SearchIndexDocument, SearchError> {
        let index = self.index()?;
        let (room, listing) = self.resolve_context(message).await;

        let document = SearchIndexDocument::for_message(message, room.as_ref(), listing.as_ref());
        index.index(&document.id, &document).await?;

        tracing::debug!("Indexed message {} (post: {:?})", document.id, document.post_id);
        Ok(document)
    }

    async fn resolve_context(&self, message: &ChatMessage) -> (Option<ChatRoom>, Option<Listing>) {
        if message.room_id.is_empty() {
            return (None, None);
        }

        let room: Option<ChatRoom> = self.lookup(Collection::ChatRooms, &message.room_id).await;
        let listing = match &room {
            Some(room) if !room.post_id.is_empty() => self.lookup(Collection::Posts, &room.post_id).await,
            _ => None,
        };

        (room, listing)
    }

    async fn lookup<T: serde::de::DeserializeOwned>(&self, collection: Collection, id: &str) -> Option<T> {
        match fetch(self.store.as_ref(), collection, id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Could not read {} record {}: {}", collection.table(), id, e);
                None
            }
        }
    }

    /// Tag an indexed message with a conversation type
    pub async fn classify_message(&self, message_id: &str, message_type: &str) -> Result<MessageType, ChatError> {
        let parsed = message_type
            .parse::<MessageType>()
            .ok()
            .filter(|t| t.is_assignable())
            .ok_or_else(|| ChatError::InvalidMessageType(message_type.to_string()))?;

        let index = self.index()?;
        index
            .update(
                message_id,
                json!({ (fields::CLASSIFIED): true, (fields::MESSAGE_TYPE): parsed.as_str() }),
            )
            .await?;

        tracing::info!("Message {} classified as {}", message_id, parsed.as_str());
        Ok(parsed)
    }

    /// Free-text search over message content and attributes, newest first
    pub async fn search_messages(&self, text: &str, page: Pagination) -> Result<MessagePage, SearchError> {
        let index = self.index()?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(MessagePage::default());
        }

        let query = Clause::multi_match(
            text,
            vec![
                (fields::CONTENT, 1.0),
                (fields::CATEGORY, 1.0),
                (fields::LOCATION, 1.0),
                (fields::KEYWORDS, 2.0),
            ],
        );
        let request = SearchRequest::new(query, page.offset(), page.page_size as usize)
            .sorted_by(SortOrder::FieldDesc(fields::CREATED_AT));

        let response = index.search(&request).await?;

        let messages = response
            .hits
            .into_iter()
            .filter_map(|hit| match serde_json::from_value::<SearchIndexDocument>(hit.source) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!("Skipping malformed search document {}: {}", hit.id, e);
                    None
                }
            })
            .collect();

        Ok(MessagePage {
            messages,
            total: response.total,
        })
    }
}
