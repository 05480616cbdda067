use crate::core::query::{fields, BoolQuery, Clause};
use crate::models::{Direction, ListingAttributes};

/// Relevance weights of the optional match clauses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostWeights {
    pub category: f64,
    pub location: f64,
    pub condition: f64,
    /// Overlap between the keyword sets
    pub keywords: f64,
    /// Each individual keyword found in the content text
    pub keyword_content: f64,
}

impl Default for BoostWeights {
    fn default() -> Self {
        Self {
            category: 3.0,
            location: 2.0,
            condition: 1.5,
            keywords: 2.0,
            keyword_content: 1.0,
        }
    }
}

/// Acceptable counterparty price range for a listing, inclusive.
///
/// A buyer accepts anything from half their budget up to the budget; a
/// seller accepts offers from the asking price up to 50% above it. Bounds
/// are truncated to integers. `None` when no price was given.
pub fn price_window(direction: Direction, price: u64) -> Option<(u64, u64)> {
    if price == 0 {
        return None;
    }

    Some(match direction {
        Direction::WantToBuy => (price / 2, price),
        Direction::WantToSell => (price, price.saturating_add(price / 2)),
    })
}

/// Builds the counterparty search query for classified listing attributes
#[derive(Debug, Clone, Default)]
pub struct MatchQueryBuilder {
    weights: BoostWeights,
}

impl MatchQueryBuilder {
    pub fn new(weights: BoostWeights) -> Self {
        Self { weights }
    }

    /// Build the match query
    ///
    /// - the opposite direction is a hard `must` clause, so a buy listing
    ///   only ever matches sell listings and vice versa
    /// - category, location, condition and keywords add `should` boosts,
    ///   only when present
    /// - a given price restricts candidates to [`price_window`] as a filter
    /// - when any boost exists at least one of them has to match
    pub fn build(&self, attrs: &ListingAttributes) -> Clause {
        let mut query = BoolQuery::new().must(Clause::term(
            fields::POST_TYPE,
            attrs.direction.opposite().as_str(),
        ));

        if let Some(category) = &attrs.category {
            query = query.should(Clause::term(fields::CATEGORY, category).boosted(self.weights.category));
        }

        if let Some(location) = &attrs.location {
            query = query.should(Clause::term(fields::LOCATION, location).boosted(self.weights.location));
        }

        if let Some(condition) = &attrs.condition {
            query = query.should(Clause::term(fields::CONDITION, condition).boosted(self.weights.condition));
        }

        if let Some((min, max)) = price_window(attrs.direction, attrs.price) {
            query = query.filter(Clause::range(fields::PRICE, Some(min), Some(max)));
        }

        let keywords: Vec<String> = attrs
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        if !keywords.is_empty() {
            query = query.should(Clause::terms(fields::KEYWORDS, keywords.clone()).boosted(self.weights.keywords));

            // One clause per keyword so a strong keyword can contribute more than once
            for keyword in keywords {
                query = query.should(
                    Clause::match_text(fields::CONTENT, keyword).boosted(self.weights.keyword_content),
                );
            }
        }

        if !query.should.is_empty() {
            query = query.minimum_should_match(1);
        }

        Clause::Bool(query)
    }
}

/// Offset of the first hit of a 1-based page
pub fn page_offset(page: u32, page_size: u32) -> usize {
    page.saturating_sub(1) as usize * page_size as usize
}
