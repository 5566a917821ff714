//! Snapshot export.
//!
//! The exporter flattens the store into the snapshot shape that startup sync
//! reads back. Handlers report mutations through a [`ChangeNotifier`]; a
//! background task turns those events into best-effort rewrites of the
//! snapshot file, so a failed write never reaches the mutating request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Snapshot, SnapshotSubtopic, SnapshotTopic};

/// A successful mutation of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    TopicCreated(i64),
    TopicDeleted(i64),
    SubtopicCreated(i64),
    SubtopicDeleted(i64),
    ProblemCreated(i64),
    ProblemUpdated(i64),
    ProblemDeleted(i64),
    ProblemsImported { subtopic_id: i64, count: usize },
}

/// Outcome of writing the snapshot file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: String,
    pub topics: usize,
    pub subtopics: usize,
    pub problems: usize,
}

/// Reads the store into a [`Snapshot`] and persists it.
pub struct SnapshotExporter {
    repo: Arc<Repository>,
    path: PathBuf,
}

impl SnapshotExporter {
    pub fn new(repo: Arc<Repository>, path: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current store contents, ordered by sort_order at every level.
    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        let mut snapshot = Vec::new();

        for topic in self.repo.list_topics().await? {
            let mut subtopics = Vec::new();
            for subtopic in self.repo.list_subtopics(topic.id).await? {
                let problems = self
                    .repo
                    .list_problems(subtopic.id)
                    .await?
                    .into_iter()
                    .map(|p| p.canonical_url)
                    .collect();
                subtopics.push(SnapshotSubtopic {
                    name: subtopic.name,
                    description: subtopic.description,
                    problems,
                });
            }
            snapshot.push(SnapshotTopic {
                topic: topic.name,
                subtopics,
            });
        }

        Ok(snapshot)
    }

    /// Overwrite the snapshot file with the current store contents.
    pub async fn save(&self) -> Result<ExportSummary, AppError> {
        let snapshot = self.snapshot().await?;
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;

        let summary = ExportSummary {
            path: self.path.display().to_string(),
            topics: snapshot.len(),
            subtopics: snapshot.iter().map(|t| t.subtopics.len()).sum(),
            problems: snapshot
                .iter()
                .flat_map(|t| &t.subtopics)
                .map(|s| s.problems.len())
                .sum(),
        };
        debug!("Snapshot written: {:?}", summary);
        Ok(summary)
    }
}

/// Sending half of the change feed; disabled notifiers drop events.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    tx: Option<mpsc::UnboundedSender<StoreChange>>,
}

impl ChangeNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StoreChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self, change: StoreChange) {
        if let Some(tx) = &self.tx {
            if tx.send(change).is_err() {
                debug!("Change feed closed, dropping event");
            }
        }
    }
}

/// Consume change events and rewrite the snapshot after each burst.
///
/// Runs until every notifier is dropped.
pub async fn run_auto_export(
    exporter: Arc<SnapshotExporter>,
    mut rx: mpsc::UnboundedReceiver<StoreChange>,
) {
    info!("Auto-export enabled, writing to {:?}", exporter.path());

    while let Some(change) = rx.recv().await {
        let mut pending = 1;
        debug!("Store changed: {:?}", change);
        while let Ok(change) = rx.try_recv() {
            debug!("Store changed: {:?}", change);
            pending += 1;
        }

        if let Err(e) = exporter.save().await {
            warn!("Auto-export after {} change(s) failed: {}", pending, e);
        }
    }
}
