//! Problem metadata lookup against the LeetCode GraphQL API.
//!
//! URL helpers here are shared by startup sync and the repository so that
//! `.../slug` and `.../slug/` always compare equal.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::{Difficulty, ProblemMetadata};

#[cfg(test)]
pub mod stub;

const PROBLEM_BASE_URL: &str = "https://leetcode.com/problems";
const REFERER: &str = "https://leetcode.com";

const QUESTION_QUERY: &str = r#"
query questionData($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    title
    difficulty
    titleSlug
  }
}
"#;

/// Why a metadata lookup failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid LeetCode URL: {0}")]
    InvalidUrl(String),
    #[error("Problem not found on LeetCode: {0}")]
    NotFound(String),
    #[error("Failed to fetch from LeetCode: {0}")]
    Transport(String),
    #[error("Unexpected response from LeetCode: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Resolves a problem URL to its title and difficulty.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ProblemMetadata, FetchError>;
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"leetcode\.com/problems/([\w-]+)").expect("slug pattern is valid")
    })
}

/// Extract the problem slug from a LeetCode problem URL.
pub fn problem_slug(url: &str) -> Option<String> {
    slug_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Canonical problem URL for a slug, always with a trailing slash.
pub fn canonical_problem_url(slug: &str) -> String {
    format!("{}/{}/", PROBLEM_BASE_URL, slug)
}

pub fn normalize_trailing_slash(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Best-effort slug for any URL: the provider slug, else the last path segment.
pub fn fallback_slug(url: &str) -> String {
    if let Some(slug) = problem_slug(url) {
        return slug;
    }
    let trimmed = url.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or(without_query)
        .to_string()
}

/// "two-sum" -> "Two Sum"
pub fn humanize_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Metadata used when the provider cannot be asked or does not answer.
pub fn fallback_metadata(url: &str) -> ProblemMetadata {
    ProblemMetadata {
        title: humanize_slug(&fallback_slug(url)),
        difficulty: Difficulty::Easy,
        canonical_url: problem_slug(url)
            .map(|slug| canonical_problem_url(&slug))
            .unwrap_or_else(|| normalize_trailing_slash(url)),
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QuestionData>,
}

#[derive(Debug, Deserialize)]
struct QuestionData {
    question: Option<Question>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Question {
    title: String,
    difficulty: String,
    title_slug: String,
}

/// Turn a raw GraphQL body into metadata.
fn metadata_from_response(
    slug: &str,
    body: serde_json::Value,
) -> Result<ProblemMetadata, FetchError> {
    let response: GraphQlResponse =
        serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let question = response
        .data
        .and_then(|d| d.question)
        .ok_or_else(|| FetchError::NotFound(slug.to_string()))?;

    Ok(ProblemMetadata {
        title: question.title,
        difficulty: Difficulty::parse(&question.difficulty).unwrap_or_default(),
        canonical_url: canonical_problem_url(&question.title_slug),
    })
}

/// HTTP client for the LeetCode GraphQL endpoint.
pub struct LeetCodeClient {
    client: reqwest::Client,
    endpoint: String,
}

impl LeetCodeClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dsa-roadmap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl MetadataFetcher for LeetCodeClient {
    async fn fetch(&self, url: &str) -> Result<ProblemMetadata, FetchError> {
        let slug = problem_slug(url).ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
        debug!("Fetching LeetCode metadata for {}", slug);

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::REFERER, REFERER)
            .json(&json!({
                "query": QUESTION_QUERY,
                "variables": { "titleSlug": slug },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Transport(format!(
                "LeetCode returned HTTP {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        metadata_from_response(&slug, body)
    }
}
