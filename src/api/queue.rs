use uuid::Uuid;

use crate::infrastructure::queue::{self, Result};
use crate::infrastructure::{IngestDocumentJob, JobResult, RedisPool};

#[derive(Clone)]
pub struct JobProducer {
    pool: RedisPool,
    result_ttl_seconds: u64,
}

impl JobProducer {
    pub fn new(pool: RedisPool, result_ttl_seconds: u64) -> Self {
        Self {
            pool,
            result_ttl_seconds,
        }
    }

    pub async fn push_ingest_job(&self, job: &IngestDocumentJob) -> Result<Uuid> {
        let mut conn = queue::connection(&self.pool).await?;
        queue::enqueue(&mut conn, job, self.result_ttl_seconds).await
    }

    pub async fn get_job_status(&self, job_id: &Uuid) -> Result<Option<JobResult>> {
        let mut conn = queue::connection(&self.pool).await?;
        queue::read_status(&mut conn, job_id).await
    }

    pub async fn ping(&self) -> Result<()> {
        queue::ping(&self.pool).await
    }
}
