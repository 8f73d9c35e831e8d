mod backend;
mod jobs;
mod processing;
mod redis;

pub use backend::JobBackend;
pub use jobs::{keys, queues, IngestDocumentJob, JobResult, QueueJobStatus};
pub use processing::{enqueue, process_ingest_payload};
pub use redis::{
    connection, create_pool, ping, read_status, write_status, QueueError, RedisPool, Result,
};
