use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::domain::DomainError;
use crate::infrastructure::JobResult;

pub async fn get_job_status(
    State(state): State<AppState>,
    job_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<JobResult>> {
    let Path(job_id) = job_id.map_err(|e| ApiError::validation(e.body_text()))?;
    let producer = state.job_producer.as_ref().ok_or(ApiError::QueueDisabled)?;

    producer
        .get_job_status(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::not_found(format!("Job {job_id} not found")).into())
}
