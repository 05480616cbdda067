// Service exports
pub mod classifier;
pub mod elasticsearch;
pub mod memory_index;
pub mod memory_store;
pub mod postgres;
pub mod search;
pub mod store;

pub use classifier::{Classifier, ClassifyError, OpenAiClassifier};
pub use elasticsearch::ElasticsearchClient;
pub use memory_index::MemoryIndex;
pub use memory_store::MemoryStore;
pub use postgres::PostgresStore;
pub use search::{SearchError, SearchHit, SearchIndex, SearchResponse};
pub use store::{Collection, RecordStore, StoreError};
