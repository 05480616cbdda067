//! Typed search query clauses.
//!
//! Clauses are built and inspected as Rust values and only turned into the
//! Elasticsearch query DSL by [`Clause::to_json`] when a request leaves the
//! process.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Index field names
pub mod fields {
    pub const ID: &str = "id";
    pub const CONTENT: &str = "content";
    pub const CREATED_AT: &str = "created_at";
    pub const POST_TYPE: &str = "post_type";
    pub const CATEGORY: &str = "category";
    pub const LOCATION: &str = "location";
    pub const PRICE: &str = "price";
    pub const CONDITION: &str = "condition";
    pub const KEYWORDS: &str = "keywords";
    pub const POST_ID: &str = "post_id";
    pub const CLASSIFIED: &str = "classified";
    pub const MESSAGE_TYPE: &str = "message_type";
}

/// A single query clause
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact match on an untokenized field
    Term {
        field: &'static str,
        value: String,
        boost: Option<f64>,
    },
    /// Exact match on any of several values
    Terms {
        field: &'static str,
        values: Vec<String>,
        boost: Option<f64>,
    },
    /// Inclusive numeric range
    Range {
        field: &'static str,
        gte: Option<u64>,
        lte: Option<u64>,
    },
    /// Analyzed full-text match
    Match {
        field: &'static str,
        query: String,
        boost: Option<f64>,
    },
    /// Full-text match across several fields, each with its own weight
    MultiMatch {
        query: String,
        fields: Vec<(&'static str, f64)>,
    },
    Bool(BoolQuery),
}

impl Clause {
    pub fn term(field: &'static str, value: impl Into<String>) -> Self {
        Clause::Term {
            field,
            value: value.into(),
            boost: None,
        }
    }

    pub fn terms(field: &'static str, values: Vec<String>) -> Self {
        Clause::Terms {
            field,
            values,
            boost: None,
        }
    }

    pub fn range(field: &'static str, gte: Option<u64>, lte: Option<u64>) -> Self {
        Clause::Range { field, gte, lte }
    }

    pub fn match_text(field: &'static str, query: impl Into<String>) -> Self {
        Clause::Match {
            field,
            query: query.into(),
            boost: None,
        }
    }

    pub fn multi_match(query: impl Into<String>, fields: Vec<(&'static str, f64)>) -> Self {
        Clause::MultiMatch {
            query: query.into(),
            fields,
        }
    }

    /// Set the relevance weight of a scoring clause. Ranges, multi-field
    /// matches and bools carry their weight elsewhere and are returned unchanged.
    pub fn boosted(mut self, weight: f64) -> Self {
        match &mut self {
            Clause::Term { boost, .. } | Clause::Terms { boost, .. } | Clause::Match { boost, .. } => {
                *boost = Some(weight);
            }
            Clause::Range { .. } | Clause::MultiMatch { .. } | Clause::Bool(_) => {}
        }
        self
    }

    pub fn boost(&self) -> Option<f64> {
        match self {
            Clause::Term { boost, .. } | Clause::Terms { boost, .. } | Clause::Match { boost, .. } => *boost,
            _ => None,
        }
    }

    /// Render the clause in the Elasticsearch query DSL
    pub fn to_json(&self) -> Value {
        match self {
            Clause::Term { field, value, boost } => {
                let mut body = Map::new();
                body.insert("value".into(), json!(value));
                insert_boost(&mut body, *boost);
                json!({ "term": { *field: body } })
            }
            Clause::Terms { field, values, boost } => {
                let mut body = Map::new();
                body.insert((*field).into(), json!(values));
                insert_boost(&mut body, *boost);
                json!({ "terms": body })
            }
            Clause::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".into(), json!(gte));
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".into(), json!(lte));
                }
                json!({ "range": { *field: bounds } })
            }
            Clause::Match { field, query, boost } => {
                let mut body = Map::new();
                body.insert("query".into(), json!(query));
                insert_boost(&mut body, *boost);
                json!({ "match": { *field: body } })
            }
            Clause::MultiMatch { query, fields } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(field, weight)| {
                        if (*weight - 1.0).abs() < f64::EPSILON {
                            field.to_string()
                        } else {
                            format!("{}^{}", field, weight)
                        }
                    })
                    .collect();
                json!({ "multi_match": { "query": query, "fields": fields } })
            }
            Clause::Bool(query) => query.to_json(),
        }
    }
}

fn insert_boost(body: &mut Map<String, Value>, boost: Option<f64>) {
    if let Some(boost) = boost {
        body.insert("boost".into(), json!(boost));
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Boolean combination of clauses
///
/// `must` clauses are required and scored, `filter` clauses are required and
/// unscored, `should` clauses only add score unless `minimum_should_match`
/// makes some of them required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Clause>,
    pub filter: Vec<Clause>,
    pub should: Vec<Clause>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, clause: Clause) -> Self {
        self.must.push(clause);
        self
    }

    pub fn filter(mut self, clause: Clause) -> Self {
        self.filter.push(clause);
        self
    }

    pub fn should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    pub fn minimum_should_match(mut self, count: u32) -> Self {
        self.minimum_should_match = Some(count);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [("must", &self.must), ("filter", &self.filter), ("should", &self.should)] {
            if !clauses.is_empty() {
                body.insert(key.into(), Value::Array(clauses.iter().map(Clause::to_json).collect()));
            }
        }
        if let Some(count) = self.minimum_should_match {
            body.insert("minimum_should_match".into(), json!(count));
        }
        json!({ "bool": body })
    }
}

impl From<BoolQuery> for Clause {
    fn from(query: BoolQuery) -> Self {
        Clause::Bool(query)
    }
}

/// Sort order of a search request
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortOrder {
    /// Descending relevance score
    #[default]
    Relevance,
    /// Descending value of the given field
    FieldDesc(&'static str),
}

/// A complete search request: query, page window and ordering
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Clause,
    pub from: usize,
    pub size: usize,
    pub sort: SortOrder,
}

impl SearchRequest {
    pub fn new(query: Clause, from: usize, size: usize) -> Self {
        Self {
            query,
            from,
            size,
            sort: SortOrder::Relevance,
        }
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Request body for the `_search` endpoint. Totals are always tracked
    /// exactly, independent of the page window.
    pub fn to_body(&self) -> Value {
        let sort = match self.sort {
            SortOrder::Relevance => json!([{ "_score": { "order": "desc" } }]),
            SortOrder::FieldDesc(field) => json!([{ field: { "order": "desc" } }]),
        };
        json!({
            "query": self.query.to_json(),
            "from": self.from,
            "size": self.size,
            "sort": sort,
            "track_total_hits": true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_serialization() {
        let clause = Clause::term(fields::CATEGORY, "bike").boosted(3.0);
        assert_eq!(
            clause.to_json(),
            json!({ "term": { "category": { "value": "bike", "boost": 3.0 } } })
        );
    }

    #[test]
    fn test_terms_serialization() {
        let clause = Clause::terms(fields::KEYWORDS, vec!["a".into(), "b".into()]).boosted(2.0);
        assert_eq!(
            clause.to_json(),
            json!({ "terms": { "keywords": ["a", "b"], "boost": 2.0 } })
        );
    }

    #[test]
    fn test_range_omits_open_bounds() {
        let clause = Clause::range(fields::PRICE, Some(500), None);
        assert_eq!(clause.to_json(), json!({ "range": { "price": { "gte": 500 } } }));
    }

    #[test]
    fn test_range_ignores_boost() {
        let clause = Clause::range(fields::PRICE, Some(1), Some(2)).boosted(9.0);
        assert_eq!(clause.boost(), None);
    }

    #[test]
    fn test_multi_match_field_weights() {
        let clause = Clause::multi_match("xe", vec![(fields::CONTENT, 1.0), (fields::KEYWORDS, 2.0)]);
        assert_eq!(
            clause.to_json(),
            json!({ "multi_match": { "query": "xe", "fields": ["content", "keywords^2"] } })
        );
    }

    #[test]
    fn test_bool_skips_empty_sections() {
        let query = BoolQuery::new().must(Clause::term(fields::POST_TYPE, "ban"));
        assert_eq!(
            query.to_json(),
            json!({ "bool": { "must": [{ "term": { "post_type": { "value": "ban" } } }] } })
        );
    }

    #[test]
    fn test_search_request_body() {
        let request = SearchRequest::new(Clause::term(fields::POST_TYPE, "mua"), 20, 10)
            .sorted_by(SortOrder::FieldDesc(fields::CREATED_AT));
        let body = request.to_body();

        assert_eq!(body["from"], 20);
        assert_eq!(body["size"], 10);
        assert_eq!(body["track_total_hits"], true);
        assert_eq!(body["sort"], json!([{ "created_at": { "order": "desc" } }]));
    }
}
