//! Application layer - ingestion and retrieval use cases.
//!
//! Services depend on domain ports (traits) rather than concrete
//! implementations.

pub mod services;

pub use services::{EmbeddingClient, Indexer, QueryService, RetryPolicy};
