use deadpool_redis::{redis::AsyncCommands, Config, Connection, Pool, Runtime};
use uuid::Uuid;

use super::jobs::{keys, JobResult};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| QueueError::Pool(e.to_string()))
}

pub async fn connection(pool: &RedisPool) -> Result<Connection> {
    pool.get().await.map_err(|e| QueueError::Pool(e.to_string()))
}

pub async fn write_status(
    conn: &mut Connection,
    status: &JobResult,
    ttl_seconds: u64,
) -> Result<()> {
    let json = serde_json::to_string(status)?;
    conn.set_ex::<_, _, ()>(keys::job_status(&status.job_id), &json, ttl_seconds)
        .await
        .map_err(|e| QueueError::Redis(e.to_string()))
}

pub async fn read_status(conn: &mut Connection, job_id: &Uuid) -> Result<Option<JobResult>> {
    let result: Option<String> = conn
        .get(keys::job_status(job_id))
        .await
        .map_err(|e| QueueError::Redis(e.to_string()))?;

    result
        .map(|json| serde_json::from_str(&json).map_err(Into::into))
        .transpose()
}

pub async fn ping(pool: &RedisPool) -> Result<()> {
    let mut conn = connection(pool).await?;
    let pong: std::result::Result<String, _> =
        deadpool_redis::redis::cmd("PING").query_async(&mut *conn).await;
    pong.map(|_| ()).map_err(|e| QueueError::Redis(e.to_string()))
}
