//! In-process search index for tests and local development.
//!
//! Evaluates the typed query clauses directly against stored documents with
//! the same field semantics as the Elasticsearch mapping: `content` is
//! analyzed (lowercased, accents folded), every other field matches exactly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::RwLock;
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

use crate::core::query::{fields, BoolQuery, Clause, SearchRequest, SortOrder};
use crate::models::SearchIndexDocument;
use crate::services::search::{SearchError, SearchHit, SearchIndex, SearchResponse};

const ANALYZED_FIELDS: &[&str] = &[fields::CONTENT];

/// Analyzer mirroring the `folding_analyzer` of the Elasticsearch mapping
pub fn folding_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(AsciiFoldingFilter)
        .build()
}

/// Lowercase, strip diacritics and split into alphanumeric tokens
pub fn analyze(text: &str) -> Vec<String> {
    let mut analyzer = folding_analyzer();
    let mut stream = analyzer.token_stream(text);

    let mut tokens = Vec::new();
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    tokens
}

/// In-memory [`SearchIndex`]. Documents keep insertion order, which breaks
/// score ties.
#[derive(Default)]
pub struct MemoryIndex {
    documents: RwLock<Vec<(String, Value)>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw source document, bypassing [`SearchIndexDocument`]
    pub fn insert_raw(&self, id: &str, source: Value) {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        match documents.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, slot)) => *slot = source,
            None => documents.push((id.to_string(), source)),
        }
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        documents
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, source)| source.clone())
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Score of `clause` against `doc`, or `None` when the document does not match
pub fn evaluate(clause: &Clause, doc: &Value) -> Option<f64> {
    match clause {
        Clause::Term { field, value, boost } => {
            exact_values(doc, field)
                .iter()
                .any(|v| v == value)
                .then(|| boost.unwrap_or(1.0))
        }
        Clause::Terms { field, values, boost } => {
            let present = exact_values(doc, field);
            values
                .iter()
                .any(|v| present.contains(v))
                .then(|| boost.unwrap_or(1.0))
        }
        Clause::Range { field, gte, lte } => {
            let value = doc.get(*field).and_then(Value::as_f64)?;
            let above = gte.map_or(true, |min| value >= min as f64);
            let below = lte.map_or(true, |max| value <= max as f64);
            (above && below).then_some(0.0)
        }
        Clause::Match { field, query, boost } => {
            text_score(doc, field, query).map(|s| s * boost.unwrap_or(1.0))
        }
        Clause::MultiMatch { query, fields } => fields
            .iter()
            .filter_map(|(field, weight)| text_score(doc, field, query).map(|s| s * weight))
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
        Clause::Bool(query) => evaluate_bool(query, doc),
    }
}

fn evaluate_bool(query: &BoolQuery, doc: &Value) -> Option<f64> {
    let mut score = 0.0;

    for clause in &query.must {
        score += evaluate(clause, doc)?;
    }

    for clause in &query.filter {
        evaluate(clause, doc)?;
    }

    let mut matched_should = 0u32;
    for clause in &query.should {
        if let Some(s) = evaluate(clause, doc) {
            matched_should += 1;
            score += s;
        }
    }

    // Without required clauses a should list behaves as "at least one"
    let required = query.minimum_should_match.unwrap_or(
        if query.must.is_empty() && query.filter.is_empty() && !query.should.is_empty() {
            1
        } else {
            0
        },
    );

    (matched_should >= required).then_some(score)
}

/// Field values as exact strings; arrays contribute every element
fn exact_values(doc: &Value, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(value) => scalar_string(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Number of query tokens found in the field; exact comparison on
/// non-analyzed fields
fn text_score(doc: &Value, field: &str, query: &str) -> Option<f64> {
    if !ANALYZED_FIELDS.contains(&field) {
        return exact_values(doc, field)
            .iter()
            .any(|v| v == query)
            .then_some(1.0);
    }

    let text = doc.get(field).and_then(Value::as_str)?;
    let tokens = analyze(text);
    let matched = analyze(query)
        .iter()
        .filter(|token| tokens.contains(token))
        .count();

    (matched > 0).then_some(matched as f64)
}

fn sort_key(source: &Value, field: &str) -> Option<DateTime<Utc>> {
    source
        .get(field)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn index(&self, id: &str, document: &SearchIndexDocument) -> Result<(), SearchError> {
        let source = serde_json::to_value(document)
            .map_err(|e| SearchError::ExecutionError(format!("Failed to encode document: {}", e)))?;
        self.insert_raw(id, source);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let mut matched: Vec<SearchHit> = {
            let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
            documents
                .iter()
                .filter_map(|(id, source)| {
                    evaluate(&request.query, source).map(|score| SearchHit {
                        id: id.clone(),
                        score,
                        source: source.clone(),
                    })
                })
                .collect()
        };

        // Stable sorts keep insertion order among equal keys
        match request.sort {
            SortOrder::Relevance => {
                matched.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            }
            SortOrder::FieldDesc(field) => {
                matched.sort_by(|a, b| sort_key(&b.source, field).cmp(&sort_key(&a.source, field)));
            }
        }

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .collect();

        Ok(SearchResponse { hits, total })
    }

    async fn update(&self, id: &str, fields: Value) -> Result<(), SearchError> {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        let (_, source) = documents
            .iter_mut()
            .find(|(existing, _)| existing == id)
            .ok_or_else(|| SearchError::ExecutionError(format!("document_missing_exception: {}", id)))?;

        if let (Value::Object(target), Value::Object(patch)) = (source, fields) {
            target.extend(patch);
        }
        Ok(())
    }
}
