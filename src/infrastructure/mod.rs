pub mod bootstrap;
pub mod config;
pub mod embedding;
pub mod queue;
pub mod telemetry;
pub mod vector_store;

pub use bootstrap::Services;
pub use config::{AppConfig, ConfigError};
pub use embedding::{HashedEmbedding, OpenAiEmbedding};
pub use queue::{keys, queues, IngestDocumentJob, JobResult, QueueError, QueueJobStatus, RedisPool};
pub use telemetry::init_tracing;
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
