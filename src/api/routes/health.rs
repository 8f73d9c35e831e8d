use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub vector_store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<String>,
}

fn connection_state(ok: bool) -> String {
    if ok { "connected" } else { "disconnected" }.into()
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let store_ok = match state.vector_store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "vector store not ready");
            false
        }
    };

    let redis_ok = match &state.job_producer {
        Some(producer) => Some(match producer.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "redis not ready");
                false
            }
        }),
        None => None,
    };

    let is_ready = store_ok && redis_ok.unwrap_or(true);

    let response = ReadinessResponse {
        status: if is_ready { "ready" } else { "not_ready" }.into(),
        vector_store: connection_state(store_ok),
        redis: redis_ok.map(connection_state),
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
