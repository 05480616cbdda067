use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::domain::Direction;

/// Request to find matches for free-form listing text
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(default, alias = "page_size", rename = "pageSize", deserialize_with = "lenient_int")]
    pub page_size: Option<i64>,
}

/// Request to classify free-form text without matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub content: String,
}

/// Request to create a listing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub content: String,
    /// Explicit direction chosen by the poster; overrides classification
    #[serde(rename = "type")]
    pub direction: Direction,
}

/// Request to post a chat message into a room
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "room_id", rename = "roomId")]
    pub room_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "sender_id", rename = "senderId")]
    pub sender_id: String,
    #[validate(length(min = 1))]
    pub content: String,
}

/// Request to re-index a stored chat message
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IndexMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "message_id", rename = "messageId")]
    pub message_id: String,
}

/// Request to tag an indexed message with a conversation type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClassifyMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "message_id", rename = "messageId")]
    pub message_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "message_type", rename = "messageType")]
    pub message_type: String,
}

/// Query string for free-text chat search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchChatQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(default, alias = "page_size", rename = "pageSize", deserialize_with = "lenient_int")]
    pub page_size: Option<i64>,
}

/// Accept a page number as a JSON number or a numeric string; anything
/// unparseable reads as absent. Range checks are left to [`Pagination::normalize`].
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Page window after request-level normalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl Pagination {
    /// Clamp caller input: a page below 1 becomes 1 and an out-of-range
    /// page size falls back to `default_size`.
    pub fn normalize(page: Option<i64>, page_size: Option<i64>, default_size: u32, max_size: u32) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s >= 1 && *s <= i64::from(max_size))
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(default_size);

        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        crate::core::page_offset(self.page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::normalize(None, None, 10, 50);
        assert_eq!(p, Pagination { page: 1, page_size: 10 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps_out_of_range() {
        let p = Pagination::normalize(Some(0), Some(500), 10, 50);
        assert_eq!(p, Pagination { page: 1, page_size: 10 });

        let p = Pagination::normalize(Some(3), Some(20), 10, 50);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_negative_input_falls_back() {
        let p = Pagination::normalize(Some(-1), Some(-5), 10, 100);
        assert_eq!(p, Pagination { page: 1, page_size: 10 });

        let p = Pagination::normalize(Some(i64::MAX), Some(100), 10, 100);
        assert_eq!(p, Pagination { page: 1, page_size: 100 });
    }

    #[test]
    fn test_find_request_accepts_negative_and_string_pages() {
        let req: FindMatchesRequest =
            serde_json::from_str(r#"{"content":"mua xe","page":-1,"pageSize":"-5"}"#).unwrap();
        assert_eq!(req.page, Some(-1));
        assert_eq!(req.page_size, Some(-5));

        let req: FindMatchesRequest =
            serde_json::from_str(r#"{"content":"mua xe","page":"abc","page_size":null}"#).unwrap();
        assert_eq!(req.page, None);
        assert_eq!(req.page_size, None);
    }

    #[test]
    fn test_create_post_request_parses_direction() {
        let req: CreatePostRequest =
            serde_json::from_str(r#"{"userId":"u1","content":"bán xe","type":"ban"}"#).unwrap();
        assert_eq!(req.direction, Direction::WantToSell);
        assert!(req.validate().is_ok());
    }
}
