//! Subtopic API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{created, error, success, ApiResult};
use crate::errors::AppError;
use crate::export::StoreChange;
use crate::models::{CreateSubtopicRequest, Problem, Subtopic, SubtopicStats};
use crate::AppState;

/// GET /api/topics/:id/subtopics - List the subtopics of a topic.
pub async fn list_subtopics(
    State(state): State<AppState>,
    Path(topic_id): Path<i64>,
) -> ApiResult<Vec<Subtopic>> {
    match state.repo.get_topic(topic_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return error(AppError::NotFound(format!("Topic {} not found", topic_id))),
        Err(e) => return error(e),
    }

    match state.repo.list_subtopics(topic_id).await {
        Ok(subtopics) => success(subtopics),
        Err(e) => error(e),
    }
}

/// POST /api/subtopics - Create a new subtopic.
pub async fn create_subtopic(
    State(state): State<AppState>,
    Json(request): Json<CreateSubtopicRequest>,
) -> ApiResult<Subtopic> {
    // Validate required fields
    let Some(topic_id) = request.topic_id else {
        return error(AppError::Validation("topic_id and name are required".to_string()));
    };
    let name = request.name.trim();
    if name.is_empty() {
        return error(AppError::Validation("topic_id and name are required".to_string()));
    }
    let description = request.description.as_deref().unwrap_or("");

    match state.repo.create_subtopic(topic_id, name, description).await {
        Ok(subtopic) => {
            state.changes.notify(StoreChange::SubtopicCreated(subtopic.id));
            created(subtopic)
        }
        Err(e) => error(e),
    }
}

/// DELETE /api/subtopics/:id - Delete a subtopic and its problems.
pub async fn delete_subtopic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    match state.repo.delete_subtopic(id).await {
        Ok(()) => {
            state.changes.notify(StoreChange::SubtopicDeleted(id));
            success(())
        }
        Err(e) => error(e),
    }
}

/// GET /api/subtopics/:id/problems - List the problems of a subtopic.
pub async fn list_problems(
    State(state): State<AppState>,
    Path(subtopic_id): Path<i64>,
) -> ApiResult<Vec<Problem>> {
    if let Err(e) = require_subtopic(&state, subtopic_id).await {
        return error(e);
    }

    match state.repo.list_problems(subtopic_id).await {
        Ok(problems) => success(problems),
        Err(e) => error(e),
    }
}

/// GET /api/subtopics/:id/stats - Done/total counters.
pub async fn subtopic_stats(
    State(state): State<AppState>,
    Path(subtopic_id): Path<i64>,
) -> ApiResult<SubtopicStats> {
    if let Err(e) = require_subtopic(&state, subtopic_id).await {
        return error(e);
    }

    match state.repo.subtopic_stats(subtopic_id).await {
        Ok(stats) => success(stats),
        Err(e) => error(e),
    }
}

async fn require_subtopic(state: &AppState, id: i64) -> Result<Subtopic, AppError> {
    state
        .repo
        .get_subtopic(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subtopic {} not found", id)))
}
