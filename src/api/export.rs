//! Snapshot export endpoints.

use axum::extract::State;

use super::{error, success, ApiResult};
use crate::export::ExportSummary;
use crate::models::Snapshot;
use crate::AppState;

/// GET /api/export - Current store contents in snapshot form.
pub async fn get_export(State(state): State<AppState>) -> ApiResult<Snapshot> {
    match state.exporter.snapshot().await {
        Ok(snapshot) => success(snapshot),
        Err(e) => error(e),
    }
}

/// POST /api/export/save - Write the snapshot file now and report what was written.
pub async fn save_export(State(state): State<AppState>) -> ApiResult<ExportSummary> {
    match state.exporter.save().await {
        Ok(summary) => {
            tracing::info!(
                "Snapshot saved to {} ({} topics, {} problems)",
                summary.path,
                summary.topics,
                summary.problems
            );
            success(summary)
        }
        Err(e) => error(e),
    }
}
