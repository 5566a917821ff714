//! Sequential bulk import of problem URLs into one subtopic.
//!
//! URLs are processed one at a time. Each attempt reports progress and ends as
//! either an imported problem or a failure message; failures never stop the
//! batch, and the failed URLs come back so the client can offer a retry.
//! There is no de-duplication: every successful URL becomes a new row.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::db::Repository;
use crate::errors::AppError;
use crate::metadata::MetadataFetcher;
use crate::models::Problem;

/// Progress after each attempt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkProgress {
    pub completed: usize,
    pub total: usize,
    pub url: String,
    pub succeeded: bool,
}

/// Per-URL result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkOutcome {
    Imported { url: String, problem: Problem },
    Failed { url: String, message: String },
}

impl BulkOutcome {
    pub fn url(&self) -> &str {
        match self {
            BulkOutcome::Imported { url, .. } | BulkOutcome::Failed { url, .. } => url,
        }
    }
}

/// Summary of a bulk import, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkImportReport {
    pub total: usize,
    pub imported: usize,
    pub outcomes: Vec<BulkOutcome>,
    /// URLs to resubmit.
    pub failed_urls: Vec<String>,
}

pub struct BulkImporter {
    repo: Arc<Repository>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl BulkImporter {
    pub fn new(repo: Arc<Repository>, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self { repo, fetcher }
    }

    /// Fetch and create a problem for each URL, strictly in order.
    ///
    /// Blank entries are ignored. Fails up front only when the subtopic is missing.
    pub async fn run<F>(
        &self,
        subtopic_id: i64,
        urls: &[String],
        mut on_progress: F,
    ) -> Result<BulkImportReport, AppError>
    where
        F: FnMut(&BulkProgress),
    {
        if self.repo.get_subtopic(subtopic_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Subtopic {} not found",
                subtopic_id
            )));
        }

        let urls: Vec<&str> = urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .collect();
        let total = urls.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, url) in urls.into_iter().enumerate() {
            let outcome = match self.import_one(subtopic_id, url).await {
                Ok(problem) => BulkOutcome::Imported {
                    url: url.to_string(),
                    problem,
                },
                Err(e) => {
                    debug!("Bulk import of {} failed: {}", url, e);
                    BulkOutcome::Failed {
                        url: url.to_string(),
                        message: e.message().to_string(),
                    }
                }
            };

            on_progress(&BulkProgress {
                completed: index + 1,
                total,
                url: url.to_string(),
                succeeded: matches!(outcome, BulkOutcome::Imported { .. }),
            });
            outcomes.push(outcome);
        }

        let failed_urls: Vec<String> = outcomes
            .iter()
            .filter(|o| matches!(o, BulkOutcome::Failed { .. }))
            .map(|o| o.url().to_string())
            .collect();
        let imported = total - failed_urls.len();
        info!(
            "Bulk import into subtopic {}: {}/{} imported",
            subtopic_id, imported, total
        );

        Ok(BulkImportReport {
            total,
            imported,
            outcomes,
            failed_urls,
        })
    }

    async fn import_one(&self, subtopic_id: i64, url: &str) -> Result<Problem, AppError> {
        let metadata = self.fetcher.fetch(url).await?;
        self.repo
            .create_problem(
                subtopic_id,
                &metadata.title,
                &metadata.canonical_url,
                metadata.difficulty,
            )
            .await
    }
}
