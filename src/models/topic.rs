//! Topic model, the root of the roadmap hierarchy.

use serde::{Deserialize, Serialize};

/// A top-level grouping such as "Arrays".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
    pub created_at: String,
}

/// Request body for creating a new topic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTopicRequest {
    #[serde(default)]
    pub name: String,
}
