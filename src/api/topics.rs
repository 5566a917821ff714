//! Topic API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{created, error, success, ApiResult};
use crate::errors::AppError;
use crate::export::StoreChange;
use crate::models::{CreateTopicRequest, Topic};
use crate::AppState;

/// GET /api/topics - List all topics.
pub async fn list_topics(State(state): State<AppState>) -> ApiResult<Vec<Topic>> {
    match state.repo.list_topics().await {
        Ok(topics) => success(topics),
        Err(e) => error(e),
    }
}

/// POST /api/topics - Create a new topic.
pub async fn create_topic(
    State(state): State<AppState>,
    Json(request): Json<CreateTopicRequest>,
) -> ApiResult<Topic> {
    let name = request.name.trim();
    if name.is_empty() {
        return error(AppError::Validation("Topic name is required".to_string()));
    }

    match state.repo.create_topic(name).await {
        Ok(topic) => {
            state.changes.notify(StoreChange::TopicCreated(topic.id));
            created(topic)
        }
        Err(e) => error(e),
    }
}

/// DELETE /api/topics/:id - Delete a topic and everything under it.
pub async fn delete_topic(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    match state.repo.delete_topic(id).await {
        Ok(()) => {
            state.changes.notify(StoreChange::TopicDeleted(id));
            success(())
        }
        Err(e) => error(e),
    }
}
