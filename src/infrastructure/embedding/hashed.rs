use async_trait::async_trait;

use crate::domain::{ports::EmbeddingProvider, Embedding, ProviderError};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedding computed locally.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one signed
/// dimension and the result is L2-normalized, so texts sharing words score
/// higher under cosine similarity. Useful for development and tests without
/// network access; it carries no semantic knowledge.
#[derive(Debug, Clone)]
pub struct HashedEmbedding {
    dimension: usize,
}

impl HashedEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let slot = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }

        Embedding::new(vector)
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        2048
    }

    fn name(&self) -> &str {
        "hashed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_and_normalized() {
        let provider = HashedEmbedding::new(32);
        let a = provider.embed_text("Hello, World");
        let b = provider.embed_text("hello world");

        assert_eq!(a, b);
        assert_eq!(a.dimension(), 32);
        let norm: f32 = a.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_score_higher() {
        let provider = HashedEmbedding::new(256);
        let query = provider.embed_text("ownership borrowing");
        let close = provider.embed_text("rust ownership and borrowing rules");
        let far = provider.embed_text("sourdough starter flour");

        assert!(query.cosine_similarity(&close) > query.cosine_similarity(&far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let provider = HashedEmbedding::new(8);
        assert!(provider.embed_text("  ,, ").as_slice().iter().all(|x| *x == 0.0));
    }
}
