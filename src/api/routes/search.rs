use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::domain::{DomainError, MetadataFilter, SearchResult};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<i64>,
    pub filter: Option<MetadataFilter>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

fn resolve_top_k(requested: Option<i64>, default: usize) -> Result<usize, DomainError> {
    match requested {
        None => Ok(default),
        Some(n) if n <= 0 => Err(DomainError::invalid_query("top_k must be positive")),
        Some(n) => usize::try_from(n).map_err(|_| DomainError::invalid_query("top_k is too large")),
    }
}

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let top_k = resolve_top_k(request.top_k, state.query.default_top_k())?;

    let results = state
        .query
        .search(&request.query, top_k, request.filter.as_ref())
        .await?;

    Ok(Json(SearchResponse { results }))
}
