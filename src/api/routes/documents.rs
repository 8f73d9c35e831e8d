use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::domain::{Document, IndexResult, Metadata};
use crate::infrastructure::IngestDocumentJob;

#[derive(Debug, Deserialize)]
pub struct IngestDocumentRequest {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<IngestDocumentRequest> for Document {
    fn from(request: IngestDocumentRequest) -> Self {
        Document::new(request.id, request.text).with_metadata(request.metadata)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: String,
}

pub async fn ingest_document(
    State(state): State<AppState>,
    payload: Result<Json<IngestDocumentRequest>, JsonRejection>,
) -> ApiResult<Json<IndexResult>> {
    let Json(request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let result = state.indexer.ingest(&request.into()).await?;
    Ok(Json(result))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.indexer.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_ingest_job(
    State(state): State<AppState>,
    payload: Result<Json<IngestDocumentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let Json(request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let producer = state.job_producer.as_ref().ok_or(ApiError::QueueDisabled)?;

    let document: Document = request.into();
    document.validate()?;

    let job_id = producer
        .push_ingest_job(&IngestDocumentJob::new(document))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id,
            status: "queued".into(),
        }),
    ))
}

