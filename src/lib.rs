//! Document ingestion and semantic search over a vector store.
//!
//! Documents are split into overlapping chunks, embedded through an
//! embedding provider and stored as vector records; queries are embedded the
//! same way and answered by nearest-neighbour search.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
