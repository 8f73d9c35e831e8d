use std::sync::Arc;

use crate::application::{EmbeddingClient, Indexer, QueryService, RetryPolicy};
use crate::domain::{ports::EmbeddingProvider, ports::VectorStore, Chunker, DomainError};
use crate::infrastructure::config::{AppConfig, EmbeddingProviderKind, RetryConfig};
use crate::infrastructure::embedding::{HashedEmbedding, OpenAiEmbedding};
use crate::infrastructure::vector_store::QdrantVectorStore;

/// The pipeline components shared by the API server and the worker.
#[derive(Clone)]
pub struct Services {
    pub indexer: Arc<Indexer>,
    pub query: Arc<QueryService>,
    pub vector_store: Arc<dyn VectorStore>,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }
}

pub fn embedding_provider(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbedding::from_config(&config.embedding)?),
        EmbeddingProviderKind::Hashed => Arc::new(HashedEmbedding::new(config.embedding.dimension)),
    };
    Ok(provider)
}

pub fn embedding_client(
    config: &AppConfig,
    provider: Arc<dyn EmbeddingProvider>,
) -> EmbeddingClient {
    EmbeddingClient::new(provider)
        .with_batch_size(config.embedding.batch_size)
        .with_timeout(config.embedding.timeout())
        .with_retry(RetryPolicy::from(&config.retry))
}

/// Builds the pipeline around an already constructed store and provider.
pub fn assemble(
    config: &AppConfig,
    provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
) -> Result<Services, DomainError> {
    let embedding = Arc::new(embedding_client(config, provider));
    let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

    let indexer = Indexer::new(chunker, embedding.clone(), vector_store.clone())
        .with_upsert_batch_size(config.indexing.upsert_batch_size);
    let query = QueryService::new(embedding, vector_store.clone())
        .with_limits(config.search.default_top_k, config.search.max_top_k);

    Ok(Services {
        indexer: Arc::new(indexer),
        query: Arc::new(query),
        vector_store,
    })
}

/// Connects to the configured embedding provider and Qdrant collection.
pub async fn connect(config: &AppConfig) -> Result<Services, DomainError> {
    let provider = embedding_provider(config)?;
    let store = QdrantVectorStore::connect(&config.vector_store, provider.dimension()).await?;
    assemble(config, provider, Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Document;
    use crate::infrastructure::InMemoryVectorStore;

    #[tokio::test]
    async fn test_assemble_with_hashed_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = EmbeddingProviderKind::Hashed;
        config.embedding.dimension = 32;
        config.chunking.chunk_size = 50;
        config.chunking.chunk_overlap = 10;

        let provider = embedding_provider(&config).unwrap();
        assert_eq!(provider.name(), "hashed");

        let store = Arc::new(InMemoryVectorStore::new());
        let services = assemble(&config, provider, store.clone()).unwrap();
        let result = services
            .indexer
            .ingest(&Document::new("doc", "short text"))
            .await
            .unwrap();

        assert_eq!(result.chunk_count, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_openai_provider_needs_key() {
        let config = AppConfig::default();
        assert!(embedding_provider(&config).is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
        });
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff(3).as_millis(), 40);
        assert_eq!(policy.backoff(4).as_millis(), 50);
    }
}
