use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::QueueError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_written: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("Job queue is not configured")]
    QueueDisabled,
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Queue(_) | Self::QueueDisabled => (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_ERROR"),
            Self::Domain(err) => match err {
                DomainError::InvalidInput(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
                }
                DomainError::InvalidQuery(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_QUERY"),
                DomainError::ProviderRejected(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_REJECTED"),
                DomainError::ProviderUnavailable { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE")
                }
                DomainError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
                DomainError::PartialIngestFailure { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PARTIAL_INGEST_FAILURE")
                }
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DomainError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let detail = if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
            match &self {
                Self::Domain(DomainError::Internal(_)) => "Internal server error".to_string(),
                other => other.to_string(),
            }
        } else {
            tracing::warn!(error = %self, code, "request rejected");
            self.to_string()
        };

        let records_written = match &self {
            Self::Domain(err) => err.records_written(),
            _ => None,
        };

        let body = ErrorResponse {
            detail,
            code: code.to_string(),
            records_written,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
