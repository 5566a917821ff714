//! Metadata lookup endpoint.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{FetchMetadataRequest, ProblemMetadata};
use crate::AppState;

/// POST /api/metadata/fetch - Resolve a problem URL to its title and difficulty.
pub async fn fetch_metadata(
    State(state): State<AppState>,
    Json(request): Json<FetchMetadataRequest>,
) -> ApiResult<ProblemMetadata> {
    let url = request.url.trim();
    if url.is_empty() {
        return error(AppError::Validation("URL is required".to_string()));
    }

    match state.fetcher.fetch(url).await {
        Ok(metadata) => success(metadata),
        Err(e) => error(e.into()),
    }
}
