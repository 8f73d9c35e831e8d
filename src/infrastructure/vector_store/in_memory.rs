use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, MetadataFilter, VectorMatch, VectorRecord,
};

/// Brute-force cosine search over records held in process memory.
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for_document(&self, document_id: &str) -> usize {
        self.records
            .read()
            .map(|r| {
                r.values()
                    .filter(|rec| rec.payload.document_id == document_id)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn chunk_ids_for_document(&self, document_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .read()
            .map(|r| {
                r.values()
                    .filter(|rec| rec.payload.document_id == document_id)
                    .map(|rec| rec.chunk_id.clone())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), DomainError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        for record in records {
            store.insert(record.chunk_id.clone(), record.clone());
        }
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<(), DomainError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        store.retain(|_, record| record.payload.document_id != document_id);
        Ok(())
    }

    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, DomainError> {
        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut matches: Vec<VectorMatch> = store
            .values()
            .filter(|record| filter.map_or(true, |f| f.matches(&record.payload.metadata)))
            .map(|record| VectorMatch {
                chunk_id: record.chunk_id.clone(),
                score: vector.cosine_similarity(&record.vector),
                payload: Some(record.payload.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chunk, Metadata, MetadataValue};

    fn record(document_id: &str, index: usize, vector: Vec<f32>, topic: &str) -> VectorRecord {
        let chunk = Chunk {
            document_id: document_id.to_string(),
            index,
            text: format!("{document_id} chunk {index}"),
            start: 0,
            end: 0,
            overlap: 0,
        };
        let metadata = Metadata::from([("topic".to_string(), MetadataValue::from(topic))]);
        VectorRecord::from_chunk(chunk, Embedding::new(vector), &metadata)
    }

    #[tokio::test]
    async fn test_upsert_and_query() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[record("doc", 0, vec![1.0, 0.0, 0.0], "a")])
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = store.query(&query, 1, None).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "doc:0");
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].payload.as_ref().unwrap().text, "doc chunk 0");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_chunk_id() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[record("doc", 0, vec![1.0, 0.0], "a")])
            .await
            .unwrap();
        store
            .upsert(&[record("doc", 0, vec![0.0, 1.0], "a")])
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let results = store
            .query(&Embedding::new(vec![0.0, 1.0]), 5, None)
            .await
            .unwrap();
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                record("doc", 0, vec![1.0, 0.0, 0.0], "a"),
                record("doc", 1, vec![0.0, 1.0, 0.0], "a"),
                record("other", 0, vec![0.0, 0.0, 1.0], "a"),
            ])
            .await
            .unwrap();

        store.delete_by_document("doc").await.unwrap();

        assert_eq!(store.count_for_document("doc"), 0);
        assert_eq!(store.chunk_ids_for_document("other"), vec!["other:0"]);
    }

    #[tokio::test]
    async fn test_query_orders_filters_and_truncates() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                record("a", 0, vec![1.0, 0.0], "x"),
                record("b", 0, vec![0.8, 0.6], "y"),
                record("c", 0, vec![0.0, 1.0], "x"),
            ])
            .await
            .unwrap();
        let query = Embedding::new(vec![1.0, 0.0]);

        let all = store.query(&query, 2, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a:0", "b:0"]);

        let filter = MetadataFilter::new().eq("topic", "x");
        let filtered = store.query(&query, 5, Some(&filter)).await.unwrap();
        let ids: Vec<_> = filtered.iter().map(|m| m.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a:0", "c:0"]);
    }
}
