use crate::domain::{Embedding, ProviderError};
use async_trait::async_trait;

/// One raw call to an external embedding service.
///
/// Implementations do not retry; they only classify failures so the caller
/// can decide whether another attempt makes sense.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError>;
    fn dimension(&self) -> usize;
    /// Largest batch the service accepts in a single request.
    fn max_batch_size(&self) -> usize;
    fn name(&self) -> &str;
}
