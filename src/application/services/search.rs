use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::application::EmbeddingClient;
use crate::domain::{
    ports::VectorStore, DomainError, MetadataFilter, Result, SearchResult, VectorMatch,
};

pub struct QueryService {
    embedding: Arc<EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
    max_top_k: usize,
}

impl QueryService {
    pub fn new(embedding: Arc<EmbeddingClient>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            vector_store,
            default_top_k: 5,
            max_top_k: 100,
        }
    }

    pub fn with_limits(mut self, default_top_k: usize, max_top_k: usize) -> Self {
        self.default_top_k = default_top_k;
        self.max_top_k = max_top_k;
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    #[instrument(skip(self, filter), fields(query_len = query.len()))]
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(DomainError::invalid_query("query text must not be empty"));
        }
        if top_k == 0 {
            return Err(DomainError::invalid_query("top_k must be positive"));
        }
        if top_k > self.max_top_k {
            return Err(DomainError::invalid_query(format!(
                "top_k must not exceed {}",
                self.max_top_k
            )));
        }
        let filter = filter.filter(|f| !f.is_empty());

        let vector = self.embedding.embed_one(query).await?;
        let matches = self.vector_store.query(&vector, top_k, filter).await?;
        debug!(matches = matches.len(), "vector store returned matches");

        let mut results = matches
            .into_iter()
            .map(resolve)
            .collect::<Result<Vec<_>>>()?;

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }
}

fn resolve(m: VectorMatch) -> Result<SearchResult> {
    let payload = m.payload.ok_or_else(|| {
        DomainError::internal(format!("chunk {} has no stored payload", m.chunk_id))
    })?;

    Ok(SearchResult {
        chunk_id: m.chunk_id,
        score: m.score,
        document_id: payload.document_id,
        chunk_index: payload.chunk_index,
        text: payload.text,
        metadata: payload.metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Indexer;
    use crate::domain::{Chunker, Document, Embedding, VectorRecord};
    use crate::infrastructure::{HashedEmbedding, InMemoryVectorStore};
    use async_trait::async_trait;

    struct PayloadlessStore;

    #[async_trait]
    impl VectorStore for PayloadlessStore {
        async fn upsert(&self, _records: &[VectorRecord]) -> Result<()> {
            Ok(())
        }

        async fn delete_by_document(&self, _document_id: &str) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &Embedding,
            _top_k: usize,
            _filter: Option<&MetadataFilter>,
        ) -> Result<Vec<VectorMatch>> {
            Ok(vec![VectorMatch {
                chunk_id: "doc:0".into(),
                score: 0.9,
                payload: None,
            }])
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    async fn seeded() -> QueryService {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedding = Arc::new(EmbeddingClient::new(Arc::new(HashedEmbedding::new(64))));
        let indexer = Indexer::new(Chunker::new(60, 10).unwrap(), embedding.clone(), store.clone());

        let docs = [
            Document::new("rust", "Rust is a systems programming language with ownership and borrowing.")
                .with_field("topic", "programming"),
            Document::new("bread", "Sourdough bread needs flour, water, salt and a lively starter.")
                .with_field("topic", "cooking"),
            Document::new("tea", "Green tea is steeped briefly in water below boiling.")
                .with_field("topic", "cooking"),
        ];
        for doc in &docs {
            indexer.ingest(doc).await.unwrap();
        }

        QueryService::new(embedding, store)
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let service = seeded().await;
        let err = service.search("", 5, None).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuery(_)));

        let err = service.search("   ", 5, None).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_top_k_bounds() {
        let service = seeded().await.with_limits(5, 10);
        assert!(matches!(
            service.search("rust", 0, None).await,
            Err(DomainError::InvalidQuery(_))
        ));
        assert!(matches!(
            service.search("rust", 11, None).await,
            Err(DomainError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_results_sorted_and_bounded() {
        let service = seeded().await;
        let results = service.search("water", 2, None).await.unwrap();

        assert!(results.len() <= 2);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_best_match_ranks_first() {
        let service = seeded().await;
        let results = service
            .search("systems programming language ownership", 3, None)
            .await
            .unwrap();

        assert_eq!(results[0].document_id, "rust");
        assert!(results[0].text.contains("Rust"));
    }

    #[tokio::test]
    async fn test_filter_restricts_results() {
        let service = seeded().await;
        let filter = MetadataFilter::new().eq("topic", "cooking");
        let results = service.search("water", 10, Some(&filter)).await.unwrap();

        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.document_id != "rust"));
    }

    #[tokio::test]
    async fn test_missing_payload_fails_whole_search() {
        let embedding = Arc::new(EmbeddingClient::new(Arc::new(HashedEmbedding::new(8))));
        let service = QueryService::new(embedding, Arc::new(PayloadlessStore));

        let err = service.search("anything", 3, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
