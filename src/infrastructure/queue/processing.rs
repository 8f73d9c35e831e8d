use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::backend::JobBackend;
use super::jobs::{queues, IngestDocumentJob, JobResult};
use super::redis::Result;
use crate::application::Indexer;

/// Records the job as `pending`, then queues it.
///
/// The status goes first so a worker that finishes the job straight away is
/// never overwritten by the `pending` record. If the push fails the status is
/// turned into `failed`.
pub async fn enqueue<B: JobBackend + ?Sized>(
    backend: &mut B,
    job: &IngestDocumentJob,
    ttl_seconds: u64,
) -> Result<Uuid> {
    let payload = serde_json::to_string(job)?;

    let pending = JobResult::pending(job.job_id, &job.document.id);
    backend.write_status(&pending, ttl_seconds).await?;

    if let Err(e) = backend.push(queues::INGEST_QUEUE, &payload).await {
        let failed = JobResult::failed_with(
            job.job_id,
            &job.document.id,
            format!("failed to queue job: {e}"),
        );
        if let Err(status_err) = backend.write_status(&failed, ttl_seconds).await {
            warn!(job_id = %job.job_id, error = %status_err, "could not mark unqueued job as failed");
        }
        return Err(e);
    }

    info!(
        job_id = %job.job_id,
        document_id = %job.document.id,
        queue = queues::INGEST_QUEUE,
        "job queued"
    );
    Ok(job.job_id)
}

/// Runs one popped ingest payload to completion and returns the final status.
///
/// A payload that cannot be decoded is marked `failed` when its job id can
/// still be read from it.
pub async fn process_ingest_payload<B: JobBackend + ?Sized>(
    backend: &mut B,
    indexer: &Indexer,
    payload: &str,
    ttl_seconds: u64,
) -> Result<JobResult> {
    let job: IngestDocumentJob = match serde_json::from_str(payload) {
        Ok(job) => job,
        Err(e) => {
            let Some(status) = undecodable(payload, &e) else {
                error!(error = %e, "dropping job payload without a readable job id");
                return Err(e.into());
            };
            error!(job_id = %status.job_id, error = %e, "job payload could not be decoded");
            backend.write_status(&status, ttl_seconds).await?;
            return Ok(status);
        }
    };

    run_ingest(backend, indexer, job, ttl_seconds).await
}

#[instrument(skip_all, fields(job_id = %job.job_id, document_id = %job.document.id))]
async fn run_ingest<B: JobBackend + ?Sized>(
    backend: &mut B,
    indexer: &Indexer,
    job: IngestDocumentJob,
    ttl_seconds: u64,
) -> Result<JobResult> {
    info!("processing ingest");

    let processing = JobResult::processing(job.job_id, &job.document.id);
    if let Err(e) = backend.write_status(&processing, ttl_seconds).await {
        warn!(error = %e, "could not mark job as processing, continuing");
    }

    let status = match indexer.ingest(&job.document).await {
        Ok(result) => {
            info!(
                chunk_count = result.chunk_count,
                elapsed_ms = result.elapsed_ms,
                "ingest completed"
            );
            JobResult::completed(job.job_id, result)
        }
        Err(e) => {
            error!(error = %e, records_written = ?e.records_written(), "ingest failed");
            JobResult::failed(job.job_id, &job.document.id, &e)
        }
    };

    backend.write_status(&status, ttl_seconds).await?;
    Ok(status)
}

fn undecodable(payload: &str, err: &serde_json::Error) -> Option<JobResult> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let job_id = value.get("job_id")?.as_str()?.parse::<Uuid>().ok()?;
    let document_id = value
        .pointer("/document/id")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    Some(JobResult::failed_with(
        job_id,
        document_id,
        format!("invalid job payload: {err}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::EmbeddingClient;
    use crate::domain::{Chunker, Document};
    use crate::infrastructure::queue::{QueueError, QueueJobStatus};
    use crate::infrastructure::{HashedEmbedding, InMemoryVectorStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Write {
        Status(QueueJobStatus),
        Push(String),
    }

    /// Records writes in order and fails the ones it is told to.
    #[derive(Default)]
    struct RecordingBackend {
        writes: Vec<Write>,
        statuses: Vec<JobResult>,
        fail_push: bool,
        fail_status: Option<QueueJobStatus>,
    }

    #[async_trait]
    impl JobBackend for RecordingBackend {
        async fn write_status(&mut self, status: &JobResult, _ttl_seconds: u64) -> Result<()> {
            if self.fail_status == Some(status.status) {
                return Err(QueueError::Redis("connection reset".into()));
            }
            self.writes.push(Write::Status(status.status));
            self.statuses.push(status.clone());
            Ok(())
        }

        async fn push(&mut self, queue: &str, _payload: &str) -> Result<()> {
            if self.fail_push {
                return Err(QueueError::Redis("connection reset".into()));
            }
            self.writes.push(Write::Push(queue.to_string()));
            Ok(())
        }
    }

    fn indexer() -> Indexer {
        let embedding = Arc::new(EmbeddingClient::new(Arc::new(HashedEmbedding::new(16))));
        Indexer::new(
            Chunker::new(50, 10).unwrap(),
            embedding,
            Arc::new(InMemoryVectorStore::new()),
        )
    }

    #[tokio::test]
    async fn test_enqueue_writes_pending_before_push() {
        let mut backend = RecordingBackend::default();
        let job = IngestDocumentJob::new(Document::new("doc", "text"));

        let job_id = enqueue(&mut backend, &job, 60).await.unwrap();

        assert_eq!(job_id, job.job_id);
        assert_eq!(
            backend.writes,
            vec![
                Write::Status(QueueJobStatus::Pending),
                Write::Push(queues::INGEST_QUEUE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_enqueue_marks_failed_when_push_fails() {
        let mut backend = RecordingBackend {
            fail_push: true,
            ..Default::default()
        };
        let job = IngestDocumentJob::new(Document::new("doc", "text"));

        assert!(enqueue(&mut backend, &job, 60).await.is_err());

        let last = backend.statuses.last().unwrap();
        assert_eq!(last.status, QueueJobStatus::Failed);
        assert_eq!(last.job_id, job.job_id);
        assert!(last.error.as_deref().unwrap().contains("failed to queue job"));
    }

    #[tokio::test]
    async fn test_job_runs_to_completion() {
        let mut backend = RecordingBackend::default();
        let job = IngestDocumentJob::new(Document::new("doc", "a short document"));
        let payload = serde_json::to_string(&job).unwrap();

        let status = process_ingest_payload(&mut backend, &indexer(), &payload, 60)
            .await
            .unwrap();

        assert_eq!(status.status, QueueJobStatus::Completed);
        assert_eq!(status.result.unwrap().chunk_count, 1);
        assert_eq!(
            backend.writes,
            vec![
                Write::Status(QueueJobStatus::Processing),
                Write::Status(QueueJobStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_job_still_runs_when_processing_write_fails() {
        let mut backend = RecordingBackend {
            fail_status: Some(QueueJobStatus::Processing),
            ..Default::default()
        };
        let job = IngestDocumentJob::new(Document::new("doc", "a short document"));
        let payload = serde_json::to_string(&job).unwrap();

        let status = process_ingest_payload(&mut backend, &indexer(), &payload, 60)
            .await
            .unwrap();

        assert_eq!(status.status, QueueJobStatus::Completed);
        assert_eq!(backend.writes, vec![Write::Status(QueueJobStatus::Completed)]);
    }

    #[tokio::test]
    async fn test_failed_ingest_is_recorded() {
        let mut backend = RecordingBackend::default();
        let job = IngestDocumentJob::new(Document::new("  ", "text"));
        let payload = serde_json::to_string(&job).unwrap();

        let status = process_ingest_payload(&mut backend, &indexer(), &payload, 60)
            .await
            .unwrap();

        assert_eq!(status.status, QueueJobStatus::Failed);
        assert!(status.error.unwrap().contains("document id"));
    }

    #[tokio::test]
    async fn test_undecodable_payload_with_job_id_is_marked_failed() {
        let mut backend = RecordingBackend::default();
        let job_id = Uuid::new_v4();
        let payload = format!(r#"{{"job_id": "{job_id}", "document": {{"id": "doc"}}}}"#);

        let status = process_ingest_payload(&mut backend, &indexer(), &payload, 60)
            .await
            .unwrap();

        assert_eq!(status.job_id, job_id);
        assert_eq!(status.document_id, "doc");
        assert_eq!(status.status, QueueJobStatus::Failed);
        assert!(status.error.unwrap().contains("invalid job payload"));
        assert_eq!(backend.writes, vec![Write::Status(QueueJobStatus::Failed)]);
    }

    #[tokio::test]
    async fn test_payload_without_job_id_is_an_error() {
        let mut backend = RecordingBackend::default();

        let result = process_ingest_payload(&mut backend, &indexer(), "not json", 60).await;

        assert!(matches!(result, Err(QueueError::Serialization(_))));
        assert!(backend.writes.is_empty());
    }
}
