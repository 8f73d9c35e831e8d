use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{DomainError, Embedding, Result};

/// Scalar metadata value attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::invalid_input("document id must not be empty"));
        }
        Ok(())
    }
}

/// A segment of a document's text. Offsets are byte offsets into the parent text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Leading bytes of `text` shared with the previous chunk.
    pub overlap: usize,
}

impl Chunk {
    pub fn id(&self) -> String {
        chunk_id(&self.document_id, self.index)
    }

    /// The part of this chunk not already covered by its predecessor.
    pub fn fresh_text(&self) -> &str {
        &self.text[self.overlap..]
    }
}

pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{}:{}", document_id, index)
}

/// Everything the store keeps next to a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub vector: Embedding,
    pub payload: RecordPayload,
}

impl VectorRecord {
    pub fn from_chunk(chunk: Chunk, vector: Embedding, metadata: &Metadata) -> Self {
        Self {
            chunk_id: chunk.id(),
            vector,
            payload: RecordPayload {
                document_id: chunk.document_id,
                chunk_index: chunk.index,
                text: chunk.text,
                start: chunk.start,
                end: chunk.end,
                metadata: metadata.clone(),
            },
        }
    }
}

/// A raw hit from the vector store, before it is resolved into a [`SearchResult`].
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub chunk_id: String,
    pub score: f32,
    pub payload: Option<RecordPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub score: f32,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub metadata: Metadata,
}

/// Shape statistics of a document's text. `length` counts chars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub length: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub has_paragraphs: bool,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let line_count = text.split('\n').count();
        Self {
            length: text.chars().count(),
            word_count: text.split_whitespace().count(),
            line_count,
            // A blank line between two others separates paragraphs.
            has_paragraphs: line_count > 1 && text.split('\n').any(|l| l.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResult {
    pub document_id: String,
    pub chunk_count: usize,
    pub elapsed_ms: u64,
    pub stats: TextStats,
}

/// Equality predicates over document metadata, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(pub BTreeMap<String, MetadataValue>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }
}
