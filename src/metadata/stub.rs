//! Scripted metadata fetcher for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{canonical_problem_url, humanize_slug, problem_slug, FetchError, MetadataFetcher};
use crate::models::{Difficulty, ProblemMetadata};

/// Answers from the slug alone unless a URL was scripted to fail.
#[derive(Default)]
pub struct StubFetcher {
    failures: HashMap<String, String>,
    difficulties: HashMap<String, Difficulty>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make lookups of `slug` fail with a transport error.
    pub fn failing(mut self, slug: &str) -> Self {
        self.failures
            .insert(slug.to_string(), "connection reset".to_string());
        self
    }

    pub fn with_difficulty(mut self, slug: &str, difficulty: Difficulty) -> Self {
        self.difficulties.insert(slug.to_string(), difficulty);
        self
    }

    /// URLs passed to `fetch`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<ProblemMetadata, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let slug = problem_slug(url).ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
        if slug == "does-not-exist" {
            return Err(FetchError::NotFound(slug));
        }
        if let Some(message) = self.failures.get(&slug) {
            return Err(FetchError::Transport(message.clone()));
        }

        Ok(ProblemMetadata {
            title: format!("{} (fetched)", humanize_slug(&slug)),
            difficulty: self.difficulties.get(&slug).copied().unwrap_or(Difficulty::Medium),
            canonical_url: canonical_problem_url(&slug),
        })
    }
}
