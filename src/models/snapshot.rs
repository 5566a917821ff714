//! Snapshot model: the portable JSON projection of the hierarchy.
//!
//! The same shape is produced by the exporter and consumed by startup sync.

use serde::{Deserialize, Serialize};

/// Ordered list of topics, the on-disk snapshot format.
pub type Snapshot = Vec<SnapshotTopic>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotTopic {
    pub topic: String,
    #[serde(default)]
    pub subtopics: Vec<SnapshotSubtopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotSubtopic {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Problem URLs in display order.
    #[serde(default)]
    pub problems: Vec<String>,
}
