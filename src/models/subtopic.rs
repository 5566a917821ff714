//! Subtopic model, a technique grouping within a topic.

use serde::{Deserialize, Serialize};

/// A pattern or technique grouping such as "Two Pointers".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtopic {
    pub id: i64,
    pub topic_id: i64,
    pub name: String,
    pub description: String,
    pub sort_order: i64,
    pub created_at: String,
}

/// Request body for creating a new subtopic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubtopicRequest {
    #[serde(default)]
    pub topic_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Progress counters for a subtopic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubtopicStats {
    pub total: i64,
    pub done: i64,
}
