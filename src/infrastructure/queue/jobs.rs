use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Document, DomainError, IndexResult};

pub mod queues {
    pub const INGEST_QUEUE: &str = "jobs:ingest";
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{}", job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub document_id: String,
    pub status: QueueJobStatus,
    pub result: Option<IndexResult>,
    pub error: Option<String>,
    pub records_written: Option<usize>,
    pub updated_at: DateTime<Utc>,
}

impl JobResult {
    fn with_status(job_id: Uuid, document_id: &str, status: QueueJobStatus) -> Self {
        Self {
            job_id,
            document_id: document_id.to_string(),
            status,
            result: None,
            error: None,
            records_written: None,
            updated_at: Utc::now(),
        }
    }

    pub fn pending(job_id: Uuid, document_id: &str) -> Self {
        Self::with_status(job_id, document_id, QueueJobStatus::Pending)
    }

    pub fn processing(job_id: Uuid, document_id: &str) -> Self {
        Self::with_status(job_id, document_id, QueueJobStatus::Processing)
    }

    pub fn completed(job_id: Uuid, result: IndexResult) -> Self {
        let mut job = Self::with_status(job_id, &result.document_id, QueueJobStatus::Completed);
        job.result = Some(result);
        job
    }

    pub fn failed(job_id: Uuid, document_id: &str, error: &DomainError) -> Self {
        let mut job = Self::failed_with(job_id, document_id, error.to_string());
        job.records_written = error.records_written();
        job
    }

    pub fn failed_with(job_id: Uuid, document_id: &str, message: impl Into<String>) -> Self {
        let mut job = Self::with_status(job_id, document_id, QueueJobStatus::Failed);
        job.error = Some(message.into());
        job
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            QueueJobStatus::Completed | QueueJobStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestDocumentJob {
    pub job_id: Uuid,
    pub document: Document,
    pub enqueued_at: DateTime<Utc>,
}

impl IngestDocumentJob {
    pub fn new(document: Document) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            document,
            enqueued_at: Utc::now(),
        }
    }
}
