// Core algorithm exports
pub mod builder;
pub mod chat;
pub mod executor;
pub mod hydrator;
pub mod listings;
pub mod matcher;
pub mod query;

pub use builder::{page_offset, price_window, BoostWeights, MatchQueryBuilder};
pub use chat::{ChatError, ChatIndexer, CreatedMessage, MessagePage};
pub use executor::{CandidatePage, SearchExecutor};
pub use hydrator::Hydrator;
pub use listings::{CreatedListing, ListingError, ListingService};
pub use matcher::{MatchEngine, MatchError, MatchOutcome, MatchStage};
pub use query::{BoolQuery, Clause, SearchRequest, SortOrder};
