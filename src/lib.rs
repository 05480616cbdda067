//! Buysell Match - classification-driven matching for a buy/sell marketplace
//!
//! Free-form listing text is classified into structured attributes, turned
//! into a weighted counterparty search, executed against the text index and
//! hydrated from the system of record.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchEngine, MatchError, MatchOutcome, MatchQueryBuilder, MatchStage};
pub use error::FailureClass;
pub use models::{Direction, ListingAttributes, MatchResult, FindMatchesRequest, FindMatchesResponse};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let query = MatchQueryBuilder::default().build(&ListingAttributes::direction_only(Direction::WantToBuy));
        assert_eq!(query.to_json()["bool"]["must"][0]["term"]["post_type"]["value"], "ban");
    }
}
