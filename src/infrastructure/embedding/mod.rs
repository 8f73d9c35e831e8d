mod hashed;
mod openai;

pub use hashed::HashedEmbedding;
pub use openai::{classify_status, OpenAiEmbedding};
