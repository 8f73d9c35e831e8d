use crate::domain::{errors::DomainError, Embedding, MetadataFilter, VectorMatch, VectorRecord};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records keyed by chunk id.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), DomainError>;
    async fn delete_by_document(&self, document_id: &str) -> Result<(), DomainError>;
    /// Nearest neighbours by descending score, at most `top_k` of them.
    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, DomainError>;
    async fn ping(&self) -> Result<(), DomainError>;
}
