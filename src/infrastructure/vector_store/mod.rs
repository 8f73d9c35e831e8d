mod in_memory;
mod qdrant;

pub use in_memory::InMemoryVectorStore;
pub use qdrant::{point_id, to_filter, QdrantVectorStore};
