use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Connection};

use super::jobs::JobResult;
use super::redis::{write_status, QueueError, Result};

/// The two queue writes the producer and the worker depend on.
#[async_trait]
pub trait JobBackend: Send {
    async fn write_status(&mut self, status: &JobResult, ttl_seconds: u64) -> Result<()>;

    async fn push(&mut self, queue: &str, payload: &str) -> Result<()>;
}

#[async_trait]
impl JobBackend for Connection {
    async fn write_status(&mut self, status: &JobResult, ttl_seconds: u64) -> Result<()> {
        write_status(self, status, ttl_seconds).await
    }

    async fn push(&mut self, queue: &str, payload: &str) -> Result<()> {
        self.lpush::<_, _, ()>(queue, payload)
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))
    }
}
