use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ClassifierSettings;
use crate::error::FailureClass;
use crate::models::{ClassifiedFields, ListingAttributes};

/// Instruction sent as the system message of every classification call
pub const SYSTEM_PROMPT: &str = "You classify buy/sell marketplace posts. \
Extract these fields and answer with a single JSON object: \
type (\"mua\" when the poster wants to buy, \"ban\" when the poster wants to sell), \
category, location, price (integer, 0 when absent), condition, \
keywords (array of 3-5 keywords). \
Leave a field empty or 0 when the post does not mention it.";

/// Errors that can occur when classifying listing text
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Classification credential is not configured")]
    MissingCredential,

    #[error("Classification service error: {0}")]
    ServiceError(String),

    #[error("Classification response could not be parsed: {0}")]
    ParseError(String),
}

impl ClassifyError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            ClassifyError::MissingCredential => FailureClass::Configuration,
            ClassifyError::ServiceError(_) => FailureClass::Upstream,
            ClassifyError::ParseError(_) => FailureClass::DataShape,
        }
    }
}

/// Turns free-form text into structured listing attributes
///
/// Every call is an independent round trip: nothing is cached or retried.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`; output without a buy/sell direction is a parse error
    async fn classify(&self, text: &str) -> Result<ListingAttributes, ClassifyError>;

    /// Classify `text` without requiring a direction, for callers that
    /// already know it
    async fn classify_fields(&self, text: &str) -> Result<ClassifiedFields, ClassifyError> {
        self.classify(text).await.map(ClassifiedFields::from)
    }
}

/// Parse the completion text into fields, ignoring surrounding whitespace
pub fn parse_fields(raw: &str) -> Result<ClassifiedFields, ClassifyError> {
    serde_json::from_str(raw.trim()).map_err(|e| ClassifyError::ParseError(format!("{}: {}", e, raw.trim())))
}

/// Parse the completion text into attributes; the direction must be present
pub fn parse_attributes(raw: &str) -> Result<ListingAttributes, ClassifyError> {
    parse_fields(raw)?
        .into_attributes()
        .ok_or_else(|| ClassifyError::ParseError(format!("no buy/sell type in: {}", raw.trim())))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Classifier backed by an OpenAI-compatible chat completion API
pub struct OpenAiClassifier {
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl OpenAiClassifier {
    /// Create a classifier. A missing key is accepted here and reported by
    /// every `classify` call instead.
    pub fn new(settings: &ClassifierSettings) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ClassifyError::ServiceError(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() {
            tracing::warn!("No classifier API key configured; classification requests will fail");
        }

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One chat completion round trip; returns the raw completion text
    async fn complete(&self, text: &str) -> Result<String, ClassifyError> {
        let api_key = self.api_key.as_deref().ok_or(ClassifyError::MissingCredential)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Post content: {}\nReturn the JSON result.", text),
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat { r#type: "json_object" },
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("Classifying {} chars with model {}", text.len(), self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::ServiceError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Classification request failed: {} - {}", status, body);
            return Err(ClassifyError::ServiceError(format!("{}: {}", status, body)));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::ServiceError(format!("Invalid completion envelope: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClassifyError::ServiceError("No choices in response".to_string()))?
            .message
            .content;

        Ok(content)
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str) -> Result<ListingAttributes, ClassifyError> {
        parse_attributes(&self.complete(text).await?)
    }

    async fn classify_fields(&self, text: &str) -> Result<ClassifiedFields, ClassifyError> {
        parse_fields(&self.complete(text).await?)
    }
}
