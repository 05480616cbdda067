use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::query::SearchRequest;
use crate::models::SearchIndexDocument;
use crate::services::search::{SearchError, SearchHit, SearchIndex, SearchResponse};

/// Index settings and mapping: accent-insensitive content, exact-match
/// identifiers and attributes, numeric price, date timestamps
fn index_definition() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": {
                "analyzer": {
                    "folding_analyzer": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "asciifolding"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "room_id": { "type": "keyword" },
                "sender_id": { "type": "keyword" },
                "content": { "type": "text", "analyzer": "folding_analyzer" },
                "created_at": { "type": "date" },
                "post_type": { "type": "keyword" },
                "category": { "type": "keyword" },
                "location": { "type": "keyword" },
                "price": { "type": "long" },
                "condition": { "type": "keyword" },
                "keywords": { "type": "keyword" },
                "buyer_id": { "type": "keyword" },
                "seller_id": { "type": "keyword" },
                "post_id": { "type": "keyword" },
                "classified": { "type": "boolean" },
                "message_type": { "type": "keyword" }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct EsSearchResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    total: EsTotal,
    #[serde(default)]
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
struct EsTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Elasticsearch client for the chat/listing index
///
/// Writes use `refresh=true` so the next search observes them.
pub struct ElasticsearchClient {
    base_url: String,
    index: String,
    client: Client,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str, index: &str, timeout_secs: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SearchError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            client,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Create the index with its mapping; an existing index is left untouched
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let url = format!("{}/{}", self.base_url, self.index);

        let response = self
            .client
            .put(&url)
            .json(&index_definition())
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            tracing::info!("Created search index {}", self.index);
            return Ok(());
        }

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let error_type = body
            .pointer("/error/type")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if error_type == "resource_already_exists_exception" {
            tracing::debug!("Search index {} already exists", self.index);
            return Ok(());
        }

        Err(SearchError::ExecutionError(format!(
            "Failed to create index {}: {} {}",
            self.index, status, body
        )))
    }

    fn document_url(&self, operation: &str, id: &str) -> String {
        format!(
            "{}/{}/{}/{}?refresh=true",
            self.base_url,
            self.index,
            operation,
            urlencoding::encode(id)
        )
    }
}

/// Connection failures mean the backend is unreachable; anything else is an
/// execution failure
fn transport_error(err: reqwest::Error) -> SearchError {
    if err.is_connect() {
        SearchError::Unavailable(err.to_string())
    } else {
        SearchError::ExecutionError(err.to_string())
    }
}

async fn ensure_success(response: Response, action: &str) -> Result<Response, SearchError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
    tracing::error!("Search {} failed: {} - {}", action, status, body);
    Err(SearchError::ExecutionError(format!("{} failed: {} {}", action, status, body)))
}

#[async_trait]
impl SearchIndex for ElasticsearchClient {
    async fn index(&self, id: &str, document: &SearchIndexDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.document_url("_doc", id))
            .json(document)
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "index").await?;
        tracing::debug!("Indexed document {}", id);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);

        let response = self
            .client
            .post(&url)
            .json(&request.to_body())
            .send()
            .await
            .map_err(transport_error)?;

        let parsed: EsSearchResponse = ensure_success(response, "query")
            .await?
            .json()
            .await
            .map_err(|e| SearchError::ExecutionError(format!("Invalid search response: {}", e)))?;

        let hits = parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                score: hit.score.unwrap_or(0.0),
                source: hit.source,
            })
            .collect();

        Ok(SearchResponse {
            hits,
            total: parsed.hits.total.value,
        })
    }

    async fn update(&self, id: &str, fields: Value) -> Result<(), SearchError> {
        let response = self
            .client
            .post(self.document_url("_update", id))
            .json(&json!({ "doc": fields }))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "update").await?;
        tracing::debug!("Updated document {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ElasticsearchClient::new("http://localhost:9200/", "chat_messages", 5).unwrap();
        assert_eq!(client.base_url, "http://localhost:9200");
        assert_eq!(client.index_name(), "chat_messages");
    }

    #[test]
    fn test_document_url_encodes_id() {
        let client = ElasticsearchClient::new("http://es", "idx", 5).unwrap();
        assert_eq!(client.document_url("_doc", "a/b"), "http://es/idx/_doc/a%2Fb?refresh=true");
    }

    #[test]
    fn test_mapping_keeps_attributes_exact() {
        let definition = index_definition();
        let properties = &definition["mappings"]["properties"];
        for field in ["category", "location", "condition", "keywords", "post_type", "post_id"] {
            assert_eq!(properties[field]["type"], "keyword", "{} should be exact-match", field);
        }
        assert_eq!(properties["content"]["analyzer"], "folding_analyzer");
        assert_eq!(properties["created_at"]["type"], "date");
    }
}
