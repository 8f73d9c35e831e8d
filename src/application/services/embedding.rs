use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::{ports::EmbeddingProvider, DomainError, Embedding, ProviderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Order-preserving, batching, retrying front for an [`EmbeddingProvider`].
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let batch_size = provider.max_batch_size().max(1);
        Self {
            provider,
            batch_size,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    /// Caps the batch size; the provider's own limit still applies.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, self.provider.max_batch_size().max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), provider = self.provider.name()))]
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch_index, batch_len = batch.len(), "embedding batch");
            let vectors = self.embed_with_retry(batch).await?;

            if vectors.len() != batch.len() {
                return Err(DomainError::provider_rejected(format!(
                    "provider returned {} embeddings for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            for vector in &vectors {
                vector.ensure_dimension(self.provider.dimension())?;
            }
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_with_retry(&self, batch: &[String]) -> Result<Vec<Embedding>> {
        let mut retries = 0;

        loop {
            let outcome = tokio::time::timeout(self.timeout, self.provider.embed_batch(batch))
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::transient(format!(
                        "request timed out after {:?}",
                        self.timeout
                    )))
                });

            let message = match outcome {
                Ok(vectors) => return Ok(vectors),
                Err(ProviderError::Rejected(message)) => {
                    return Err(DomainError::provider_rejected(message));
                }
                Err(ProviderError::Transient(message)) => message,
            };

            if retries >= self.retry.max_retries {
                return Err(DomainError::provider_unavailable(retries + 1, message));
            }
            retries += 1;

            let delay = self.retry.backoff(retries);
            warn!(retry = retries, delay_ms = delay.as_millis() as u64, error = %message, "transient embedding failure, backing off");
            tokio::time::sleep(delay).await;
        }
    }
}
