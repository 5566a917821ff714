//! Problem API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{created, error, success, ApiResult};
use crate::errors::AppError;
use crate::export::StoreChange;
use crate::import::{BulkImportReport, BulkImporter};
use crate::models::{
    BookmarkedProblem, BulkImportRequest, CreateProblemRequest, Difficulty, Problem,
    UpdateCodeRequest,
};
use crate::AppState;

/// POST /api/problems - Create a problem from already-known metadata.
pub async fn create_problem(
    State(state): State<AppState>,
    Json(request): Json<CreateProblemRequest>,
) -> ApiResult<Problem> {
    // Validate required fields
    let title = request.title.trim();
    let url = request.url.trim();
    let Some(subtopic_id) = request.subtopic_id.filter(|_| !title.is_empty() && !url.is_empty())
    else {
        return error(AppError::Validation(
            "subtopic_id, title, and url are required".to_string(),
        ));
    };

    let difficulty = match request.difficulty.as_deref().map(str::trim) {
        None | Some("") => Difficulty::Easy,
        Some(value) => match Difficulty::parse(value) {
            Some(difficulty) => difficulty,
            None => {
                return error(AppError::Validation(format!(
                    "Unknown difficulty '{}', expected Easy, Medium or Hard",
                    value
                )))
            }
        },
    };

    match state
        .repo
        .create_problem(subtopic_id, title, url, difficulty)
        .await
    {
        Ok(problem) => {
            state.changes.notify(StoreChange::ProblemCreated(problem.id));
            created(problem)
        }
        Err(e) => error(e),
    }
}

/// POST /api/problems/bulk - Fetch and create problems one URL at a time.
pub async fn bulk_import_problems(
    State(state): State<AppState>,
    Json(request): Json<BulkImportRequest>,
) -> ApiResult<BulkImportReport> {
    let Some(subtopic_id) = request.subtopic_id else {
        return error(AppError::Validation("subtopic_id is required".to_string()));
    };
    if request.urls.iter().all(|u| u.trim().is_empty()) {
        return error(AppError::Validation("At least one URL is required".to_string()));
    }

    let importer = BulkImporter::new(state.repo.clone(), state.fetcher.clone());
    let result = importer
        .run(subtopic_id, &request.urls, |progress| {
            tracing::debug!(
                "Bulk import {}/{}: {} ({})",
                progress.completed,
                progress.total,
                progress.url,
                if progress.succeeded { "ok" } else { "failed" }
            );
        })
        .await;

    match result {
        Ok(report) => {
            if report.imported > 0 {
                state.changes.notify(StoreChange::ProblemsImported {
                    subtopic_id,
                    count: report.imported,
                });
            }
            success(report)
        }
        Err(e) => error(e),
    }
}

/// PATCH /api/problems/:id/done - Toggle the done flag.
pub async fn toggle_done(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Problem> {
    match state.repo.toggle_done(id).await {
        Ok(problem) => {
            state.changes.notify(StoreChange::ProblemUpdated(id));
            success(problem)
        }
        Err(e) => error(e),
    }
}

/// PATCH /api/problems/:id/bookmark - Toggle the bookmark flag.
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Problem> {
    match state.repo.toggle_bookmark(id).await {
        Ok(problem) => {
            state.changes.notify(StoreChange::ProblemUpdated(id));
            success(problem)
        }
        Err(e) => error(e),
    }
}

/// PATCH /api/problems/:id/code - Save the code snippet.
pub async fn update_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCodeRequest>,
) -> ApiResult<Problem> {
    let code = request.code_solution.as_deref().unwrap_or("");
    let language = request
        .code_language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    match state.repo.update_code(id, code, language).await {
        Ok(problem) => {
            state.changes.notify(StoreChange::ProblemUpdated(id));
            success(problem)
        }
        Err(e) => error(e),
    }
}

/// DELETE /api/problems/:id - Delete a problem.
pub async fn delete_problem(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    match state.repo.delete_problem(id).await {
        Ok(()) => {
            state.changes.notify(StoreChange::ProblemDeleted(id));
            success(())
        }
        Err(e) => error(e),
    }
}

/// GET /api/bookmarks - All bookmarked problems, newest first.
pub async fn list_bookmarks(State(state): State<AppState>) -> ApiResult<Vec<BookmarkedProblem>> {
    match state.repo.list_bookmarks().await {
        Ok(bookmarks) => success(bookmarks),
        Err(e) => error(e),
    }
}
