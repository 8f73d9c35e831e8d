mod document;
mod embedding;

pub use document::{
    chunk_id, Chunk, Document, IndexResult, Metadata, MetadataFilter, MetadataValue,
    RecordPayload, SearchResult, TextStats, VectorMatch, VectorRecord,
};
pub use embedding::Embedding;
