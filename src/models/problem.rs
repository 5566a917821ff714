//! Problem model, a single practice item on an external judge.

use serde::{Deserialize, Serialize};

/// Judge-assigned difficulty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A practice problem owned by a subtopic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    pub id: i64,
    pub subtopic_id: i64,
    pub title: String,
    pub canonical_url: String,
    pub difficulty: Difficulty,
    pub is_done: bool,
    pub is_bookmarked: bool,
    pub code_solution: String,
    pub code_language: String,
    pub sort_order: i64,
    pub created_at: String,
}

/// A bookmarked problem together with the names of its owners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkedProblem {
    #[serde(flatten)]
    pub problem: Problem,
    pub subtopic_name: String,
    pub topic_name: String,
}

/// Request body for creating a new problem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProblemRequest {
    #[serde(default)]
    pub subtopic_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "canonical_url", alias = "leetcode_url")]
    pub url: String,
    /// Defaults to Easy when omitted.
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Request body for saving a code snippet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCodeRequest {
    #[serde(default)]
    pub code_solution: Option<String>,
    #[serde(default)]
    pub code_language: Option<String>,
}

/// Request body for the sequential bulk import.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkImportRequest {
    #[serde(default)]
    pub subtopic_id: Option<i64>,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Request body for a metadata lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchMetadataRequest {
    #[serde(default)]
    pub url: String,
}

/// Title and difficulty resolved for a problem URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemMetadata {
    pub title: String,
    pub difficulty: Difficulty,
    pub canonical_url: String,
}
