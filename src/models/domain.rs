use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a listing wants to buy or wants to sell.
///
/// Serialized as the values stored in the index `post_type` field
/// (`"mua"` / `"ban"`); parsing also accepts English spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    #[serde(rename = "mua")]
    WantToBuy,
    #[serde(rename = "ban")]
    WantToSell,
}

impl Direction {
    /// The direction a listing must have to be a counterparty of this one
    pub fn opposite(self) -> Self {
        match self {
            Direction::WantToBuy => Direction::WantToSell,
            Direction::WantToSell => Direction::WantToBuy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::WantToBuy => "mua",
            Direction::WantToSell => "ban",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "mua" | "buy" | "want_to_buy" => Ok(Direction::WantToBuy),
            "ban" | "bán" | "sell" | "want_to_sell" => Ok(Direction::WantToSell),
            other => Err(format!("unknown listing direction `{}`", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Structured attributes extracted from free-form listing text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingAttributes {
    #[serde(rename = "type")]
    pub direction: Direction,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    /// 0 means the text named no price
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: u64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
}

impl ListingAttributes {
    /// Attributes carrying only a direction, used when classification is unavailable
    pub fn direction_only(direction: Direction) -> Self {
        Self {
            direction,
            category: None,
            location: None,
            price: 0,
            condition: None,
            keywords: Vec::new(),
        }
    }
}

/// Classifier output before the direction is settled
///
/// A post that never says whether it buys or sells still yields usable
/// category, price and keyword fields, so the direction is optional here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassifiedFields {
    #[serde(rename = "type", default, deserialize_with = "lenient_direction")]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: u64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
}

impl ClassifiedFields {
    /// Attributes with `direction` replacing whatever the classifier guessed
    pub fn with_direction(self, direction: Direction) -> ListingAttributes {
        ListingAttributes {
            direction,
            category: self.category,
            location: self.location,
            price: self.price,
            condition: self.condition,
            keywords: self.keywords,
        }
    }

    /// Attributes using the classifier's own direction; `None` without one
    pub fn into_attributes(self) -> Option<ListingAttributes> {
        let direction = self.direction?;
        Some(self.with_direction(direction))
    }
}

impl From<ListingAttributes> for ClassifiedFields {
    fn from(attrs: ListingAttributes) -> Self {
        Self {
            direction: Some(attrs.direction),
            category: attrs.category,
            location: attrs.location,
            price: attrs.price,
            condition: attrs.condition,
            keywords: attrs.keywords,
        }
    }
}

/// Empty, missing or unrecognised directions all mean "not stated"
fn lenient_direction<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|raw| raw.parse().ok()))
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A buy or sell post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub content: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Listing {
    /// Build a listing from classified attributes. `direction` always wins
    /// over the classifier's guess.
    pub fn new(
        id: String,
        user_id: String,
        content: String,
        direction: Direction,
        attributes: ListingAttributes,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            direction,
            content,
            user_id,
            created_at,
            category: attributes.category,
            location: attributes.location,
            price: attributes.price,
            condition: attributes.condition,
            keywords: attributes.keywords,
        }
    }

    pub fn attributes(&self) -> ListingAttributes {
        ListingAttributes {
            direction: self.direction,
            category: self.category.clone(),
            location: self.location.clone(),
            price: self.price,
            condition: self.condition.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

/// Marketplace user as stored by the login flow.
///
/// The default value stands for an owner that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_unknown(&self) -> bool {
        self.id.is_empty()
    }
}

/// Chat message exchanged inside a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "roomId", default)]
    pub room_id: String,
    #[serde(rename = "senderId", default)]
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Chat room between a buyer and a seller about one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    #[serde(rename = "buyerId")]
    pub buyer_id: String,
    #[serde(rename = "sellerId")]
    pub seller_id: String,
    #[serde(rename = "postId")]
    pub post_id: String,
}

/// Tag carried by every indexed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Unclassified,
    Post,
    Question,
    Negotiation,
    Agreement,
    Inquiry,
    Other,
}

impl MessageType {
    /// Types a caller may assign through message classification
    pub fn is_assignable(self) -> bool {
        !matches!(self, MessageType::Unclassified | MessageType::Post)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Unclassified => "unclassified",
            MessageType::Post => "post",
            MessageType::Question => "question",
            MessageType::Negotiation => "negotiation",
            MessageType::Agreement => "agreement",
            MessageType::Inquiry => "inquiry",
            MessageType::Other => "other",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "unclassified" => Ok(MessageType::Unclassified),
            "post" => Ok(MessageType::Post),
            "question" => Ok(MessageType::Question),
            "negotiation" => Ok(MessageType::Negotiation),
            "agreement" => Ok(MessageType::Agreement),
            "inquiry" => Ok(MessageType::Inquiry),
            "other" => Ok(MessageType::Other),
            _ => Err(format!("unknown message type `{}`", raw)),
        }
    }
}

/// Denormalized projection of a message or listing stored in the search index.
///
/// Post-derived fields are `None` when no post was known at index time;
/// absence means "unknown", never "empty".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default)]
    pub classified: bool,
    pub message_type: MessageType,
}

impl SearchIndexDocument {
    /// Document for a chat message, enriched with whatever room and post context is known
    pub fn for_message(
        message: &ChatMessage,
        room: Option<&ChatRoom>,
        listing: Option<&Listing>,
    ) -> Self {
        let mut doc = Self {
            id: message.id.clone(),
            room_id: non_empty(&message.room_id),
            sender_id: non_empty(&message.sender_id),
            content: message.content.clone(),
            created_at: message.created_at,
            post_type: None,
            category: None,
            location: None,
            price: None,
            condition: None,
            keywords: Vec::new(),
            buyer_id: None,
            seller_id: None,
            post_id: None,
            classified: false,
            message_type: MessageType::Unclassified,
        };

        if let Some(room) = room {
            doc.buyer_id = non_empty(&room.buyer_id);
            doc.seller_id = non_empty(&room.seller_id);
            doc.post_id = non_empty(&room.post_id);
        }

        if let Some(listing) = listing {
            doc.apply_listing(listing);
        }

        doc
    }

    /// Synthetic document that makes a freshly created listing matchable
    pub fn for_listing(listing: &Listing) -> Self {
        let mut doc = Self {
            id: listing.id.clone(),
            room_id: None,
            sender_id: non_empty(&listing.user_id),
            content: listing.content.clone(),
            created_at: listing.created_at,
            post_type: None,
            category: None,
            location: None,
            price: None,
            condition: None,
            keywords: Vec::new(),
            buyer_id: None,
            seller_id: None,
            post_id: Some(listing.id.clone()),
            classified: false,
            message_type: MessageType::Post,
        };
        doc.apply_listing(listing);
        doc
    }

    fn apply_listing(&mut self, listing: &Listing) {
        self.post_type = Some(listing.direction);
        self.category = listing.category.clone();
        self.location = listing.location.clone();
        self.price = Some(listing.price).filter(|p| *p > 0);
        self.condition = listing.condition.clone();
        self.keywords = listing.keywords.clone();
        if self.post_id.is_none() {
            self.post_id = non_empty(&listing.id);
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A ranked reference to a listing, not yet resolved against the system of record
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub listing_id: String,
    /// Relevance only, not a probability
    pub score: f64,
}

/// Fully hydrated match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub post: Listing,
    pub user: User,
    pub score: f64,
}
