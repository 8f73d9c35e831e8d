pub mod chunking;
pub mod entities;
pub mod errors;
pub mod ports;

pub use chunking::{Chunker, Chunks};
pub use entities::*;
pub use errors::{DomainError, ProviderError, Result};
