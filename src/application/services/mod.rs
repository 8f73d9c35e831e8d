mod embedding;
mod indexer;
mod search;

pub use embedding::{EmbeddingClient, RetryPolicy};
pub use indexer::Indexer;
pub use search::QueryService;
