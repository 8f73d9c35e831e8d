use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::application::EmbeddingClient;
use crate::domain::{
    ports::VectorStore, Chunk, Chunker, Document, DomainError, IndexResult, Result, VectorRecord,
};

/// Chunks, embeds and stores documents.
///
/// Re-ingesting a document first removes every record it had, so a retry of a
/// failed ingest is always a whole-document retry. Two concurrent ingests of
/// the same document id can interleave their delete and upsert steps; callers
/// that need that to be safe must serialize them.
pub struct Indexer {
    chunker: Chunker,
    embedding: Arc<EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    upsert_batch_size: usize,
}

impl Indexer {
    pub fn new(
        chunker: Chunker,
        embedding: Arc<EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embedding,
            vector_store,
            upsert_batch_size: 100,
        }
    }

    pub fn with_upsert_batch_size(mut self, upsert_batch_size: usize) -> Self {
        self.upsert_batch_size = upsert_batch_size.max(1);
        self
    }

    #[instrument(skip(self, document), fields(document_id = %document.id, text_len = document.text.len()))]
    pub async fn ingest(&self, document: &Document) -> Result<IndexResult> {
        let started = Instant::now();
        document.validate()?;
        let stats = document.stats();

        self.vector_store.delete_by_document(&document.id).await?;

        let chunks: Vec<Chunk> = self.chunker.chunks(document).collect();
        if chunks.is_empty() {
            info!("document has no text, nothing to index");
            return Ok(IndexResult {
                document_id: document.id.clone(),
                chunk_count: 0,
                elapsed_ms: started.elapsed().as_millis() as u64,
                stats,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedding
            .embed(&texts)
            .await
            .map_err(|e| self.partial_failure(&document.id, 0, e))?;

        if embeddings.len() != chunks.len() {
            let err = DomainError::internal(format!(
                "got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            ));
            return Err(self.partial_failure(&document.id, 0, err));
        }

        let chunk_count = chunks.len();
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector, &document.metadata))
            .collect();

        let mut written = 0;
        for batch in records.chunks(self.upsert_batch_size) {
            self.vector_store
                .upsert(batch)
                .await
                .map_err(|e| self.partial_failure(&document.id, written, e))?;
            written += batch.len();
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(chunk_count, elapsed_ms, word_count = stats.word_count, "document indexed");

        Ok(IndexResult {
            document_id: document.id.clone(),
            chunk_count,
            elapsed_ms,
            stats,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        if document_id.trim().is_empty() {
            return Err(DomainError::invalid_input("document id must not be empty"));
        }
        self.vector_store.delete_by_document(document_id).await
    }

    fn partial_failure(&self, document_id: &str, written: usize, source: DomainError) -> DomainError {
        warn!(document_id, records_written = written, error = %source, "ingest left document partially indexed");
        DomainError::partial_ingest(document_id, written, source)
    }
}
