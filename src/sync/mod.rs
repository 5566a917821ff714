//! Startup sync: merge a snapshot file into the database.
//!
//! The run is sequential and append-only. Existing topics, subtopics and
//! problems are matched and left untouched; only missing rows are created, in
//! snapshot order. Metadata for a new problem is fetched once; any failure
//! degrades to a title derived from the URL. Nothing here returns an error:
//! problems are logged and counted in the [`SyncReport`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::db::{Lookup, Repository};
use crate::metadata::{
    canonical_problem_url, fallback_metadata, normalize_trailing_slash, problem_slug,
    MetadataFetcher,
};
use crate::models::{Snapshot, SnapshotSubtopic, SnapshotTopic, Subtopic, Topic};

/// Pause inserted after each external metadata request.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a fixed duration.
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Returns immediately.
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}

/// What a sync run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub topics_created: usize,
    pub subtopics_created: usize,
    pub problems_created: usize,
    pub problems_skipped: usize,
    /// Problems stored with a derived title because metadata was unavailable.
    pub fallbacks: usize,
    pub errors: usize,
}

impl SyncReport {
    pub fn rows_created(&self) -> usize {
        self.topics_created + self.subtopics_created + self.problems_created
    }
}

/// Read a snapshot file; absent or unreadable files mean there is nothing to sync.
pub async fn load_snapshot(path: &Path) -> Option<Snapshot> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No snapshot at {:?}, skipping sync", path);
            return None;
        }
        Err(e) => {
            warn!("Failed to read snapshot {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Ignoring malformed snapshot {:?}: {}", path, e);
            None
        }
    }
}

/// Applies snapshots to the store.
pub struct Reconciler {
    repo: Arc<Repository>,
    fetcher: Arc<dyn MetadataFetcher>,
    throttle: Arc<dyn Throttle>,
}

impl Reconciler {
    pub fn new(
        repo: Arc<Repository>,
        fetcher: Arc<dyn MetadataFetcher>,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self {
            repo,
            fetcher,
            throttle,
        }
    }

    /// Ensure every entry of `snapshot` exists in the store.
    pub async fn run(&self, snapshot: &Snapshot) -> SyncReport {
        let mut report = SyncReport::default();

        for entry in snapshot {
            let Some(topic) = self.ensure_topic(entry, &mut report).await else {
                continue;
            };
            for sub_entry in &entry.subtopics {
                let Some(subtopic) = self.ensure_subtopic(&topic, sub_entry, &mut report).await
                else {
                    continue;
                };
                for url in &sub_entry.problems {
                    self.ensure_problem(&subtopic, url, &mut report).await;
                }
            }
        }

        info!(
            "Sync finished: {} topics, {} subtopics, {} problems created ({} fallbacks), {} problems already present, {} errors",
            report.topics_created,
            report.subtopics_created,
            report.problems_created,
            report.fallbacks,
            report.problems_skipped,
            report.errors
        );
        report
    }

    async fn ensure_topic(&self, entry: &SnapshotTopic, report: &mut SyncReport) -> Option<Topic> {
        let lookup = match self.repo.find_topic_by_name(&entry.topic).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("Skipping topic '{}': {}", entry.topic, e);
                report.errors += 1;
                return None;
            }
        };

        match lookup {
            Lookup::Found(topic) => Some(topic),
            Lookup::Missing => match self.repo.create_topic(&entry.topic).await {
                Ok(topic) => {
                    debug!("Created topic '{}'", topic.name);
                    report.topics_created += 1;
                    Some(topic)
                }
                Err(e) => {
                    warn!("Failed to create topic '{}': {}", entry.topic, e);
                    report.errors += 1;
                    None
                }
            },
        }
    }

    async fn ensure_subtopic(
        &self,
        topic: &Topic,
        entry: &SnapshotSubtopic,
        report: &mut SyncReport,
    ) -> Option<Subtopic> {
        let lookup = match self.repo.find_subtopic_by_name(topic.id, &entry.name).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("Skipping subtopic '{}': {}", entry.name, e);
                report.errors += 1;
                return None;
            }
        };

        match lookup {
            Lookup::Found(subtopic) => Some(subtopic),
            Lookup::Missing => {
                match self
                    .repo
                    .create_subtopic(topic.id, &entry.name, &entry.description)
                    .await
                {
                    Ok(subtopic) => {
                        debug!("Created subtopic '{}' under '{}'", subtopic.name, topic.name);
                        report.subtopics_created += 1;
                        Some(subtopic)
                    }
                    Err(e) => {
                        warn!("Failed to create subtopic '{}': {}", entry.name, e);
                        report.errors += 1;
                        None
                    }
                }
            }
        }
    }

    async fn ensure_problem(&self, subtopic: &Subtopic, url: &str, report: &mut SyncReport) {
        let url = url.trim();
        if url.is_empty() {
            return;
        }

        match self.is_present(subtopic.id, url).await {
            Ok(true) => {
                report.problems_skipped += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                report.errors += 1;
                return;
            }
        }

        // Only provider URLs are worth a network round trip.
        let (metadata, fetched) = if problem_slug(url).is_some() {
            match self.fetcher.fetch(url).await {
                Ok(metadata) => (metadata, true),
                Err(e) => {
                    warn!("Metadata lookup failed for {}, using derived title: {}", url, e);
                    report.fallbacks += 1;
                    (fallback_metadata(url), true)
                }
            }
        } else {
            debug!("{} is not a LeetCode problem URL, using derived title", url);
            report.fallbacks += 1;
            (fallback_metadata(url), false)
        };

        match self
            .repo
            .create_problem(
                subtopic.id,
                &metadata.title,
                &metadata.canonical_url,
                metadata.difficulty,
            )
            .await
        {
            Ok(problem) => {
                debug!("Created problem '{}' in '{}'", problem.title, subtopic.name);
                report.problems_created += 1;
            }
            Err(e) => {
                warn!("Failed to create problem for {}: {}", url, e);
                report.errors += 1;
            }
        }

        if fetched {
            self.throttle.pause().await;
        }
    }

    /// Match on the raw URL (slash-insensitive) and on the provider's canonical form.
    async fn is_present(
        &self,
        subtopic_id: i64,
        url: &str,
    ) -> Result<bool, crate::errors::AppError> {
        if self.repo.find_problem_by_url(subtopic_id, url).await?.is_found() {
            return Ok(true);
        }
        if let Some(slug) = problem_slug(url) {
            let canonical = canonical_problem_url(&slug);
            if canonical != normalize_trailing_slash(url) {
                return Ok(self
                    .repo
                    .find_problem_by_url(subtopic_id, &canonical)
                    .await?
                    .is_found());
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::db::test_repository;
    use crate::metadata::stub::StubFetcher;
    use crate::models::{Difficulty, SnapshotSubtopic, SnapshotTopic};

    #[derive(Default)]
    struct CountingThrottle(AtomicUsize);

    #[async_trait]
    impl Throttle for CountingThrottle {
        async fn pause(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn url(slug: &str) -> String {
        format!("https://leetcode.com/problems/{}/", slug)
    }

    fn topic(name: &str, subtopics: Vec<SnapshotSubtopic>) -> SnapshotTopic {
        SnapshotTopic {
            topic: name.to_string(),
            subtopics,
        }
    }

    fn sub(name: &str, urls: &[String]) -> SnapshotSubtopic {
        SnapshotSubtopic {
            name: name.to_string(),
            description: format!("{} patterns", name),
            problems: urls.to_vec(),
        }
    }

    struct Harness {
        repo: Arc<Repository>,
        fetcher: Arc<StubFetcher>,
        throttle: Arc<CountingThrottle>,
        reconciler: Reconciler,
        _dir: tempfile::TempDir,
    }

    async fn harness(fetcher: StubFetcher) -> Harness {
        let (repo, dir) = test_repository().await;
        let repo = Arc::new(repo);
        let fetcher = Arc::new(fetcher);
        let throttle = Arc::new(CountingThrottle::default());
        let reconciler = Reconciler::new(repo.clone(), fetcher.clone(), throttle.clone());
        Harness {
            repo,
            fetcher,
            throttle,
            reconciler,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn empty_snapshot_is_a_noop() {
        let h = harness(StubFetcher::new()).await;
        let report = h.reconciler.run(&Vec::new()).await;
        assert_eq!(report, SyncReport::default());
        assert_eq!(h.repo.count_rows().await.unwrap().topics, 0);
    }

    #[tokio::test]
    async fn second_run_creates_nothing_and_fetches_nothing() {
        let h = harness(StubFetcher::new()).await;
        let u1 = url("two-sum");
        let u2 = url("3sum");
        let snap = vec![topic("Arrays", vec![sub("Two Pointers", &[u1, u2])])];

        let first = h.reconciler.run(&snap).await;
        assert_eq!(first.rows_created(), 4);
        let counts = h.repo.count_rows().await.unwrap();
        let calls = h.fetcher.calls().len();

        let second = h.reconciler.run(&snap).await;
        assert_eq!(second.rows_created(), 0);
        assert_eq!(second.problems_skipped, 2);
        assert_eq!(h.repo.count_rows().await.unwrap(), counts);
        assert_eq!(h.fetcher.calls().len(), calls);
    }

    #[tokio::test]
    async fn creation_follows_snapshot_order() {
        let h = harness(StubFetcher::new()).await;
        let (u1, u2) = (url("u-one"), url("u-two"));
        let snap = vec![
            topic("A", vec![sub("S1", &[u1.clone(), u2.clone()]), sub("S2", &[])]),
            topic("B", vec![]),
        ];

        h.reconciler.run(&snap).await;

        let topics = h.repo.list_topics().await.unwrap();
        assert_eq!(topics.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(topics[0].sort_order < topics[1].sort_order);

        let subs = h.repo.list_subtopics(topics[0].id).await.unwrap();
        assert_eq!(subs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["S1", "S2"]);
        assert_eq!(subs[0].sort_order, 1);
        assert!(subs[0].sort_order < subs[1].sort_order);
        assert_eq!(subs[0].description, "S1 patterns");

        let problems = h.repo.list_problems(subs[0].id).await.unwrap();
        assert_eq!(problems[0].canonical_url, u1);
        assert_eq!(problems[1].canonical_url, u2);
        assert_eq!(problems[0].sort_order, 1);
        assert!(problems[0].id < problems[1].id);
        assert_eq!(h.fetcher.calls(), vec![u1, u2]);
    }

    #[tokio::test]
    async fn trailing_slash_variant_is_not_imported_twice() {
        let h = harness(StubFetcher::new()).await;
        let arrays = h.repo.create_topic("Arrays").await.unwrap();
        let hashing = h.repo.create_subtopic(arrays.id, "Hashing", "").await.unwrap();
        h.repo
            .create_problem(
                hashing.id,
                "Two Sum",
                "https://leetcode.com/problems/two-sum",
                Difficulty::Easy,
            )
            .await
            .unwrap();

        let with_slash = url("two-sum");
        let report = h
            .reconciler
            .run(&vec![topic("Arrays", vec![sub("Hashing", &[with_slash])])])
            .await;

        assert_eq!(report.problems_created, 0);
        assert_eq!(report.problems_skipped, 1);
        assert_eq!(h.repo.list_problems(hashing.id).await.unwrap().len(), 1);
        assert!(h.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn non_canonical_provider_url_matches_stored_canonical() {
        let h = harness(StubFetcher::new()).await;
        let long = "https://leetcode.com/problems/two-sum/description/";
        let snap = vec![topic("Arrays", vec![sub("Hashing", &[long.to_string()])])];

        h.reconciler.run(&snap).await;
        let again = h.reconciler.run(&snap).await;

        assert_eq!(again.problems_created, 0);
        assert_eq!(h.repo.count_rows().await.unwrap().problems, 1);
    }

    #[tokio::test]
    async fn fallback_for_long_provider_url_stores_canonical_form() {
        let h = harness(StubFetcher::new().failing("two-sum")).await;
        let long = "https://leetcode.com/problems/two-sum/description/".to_string();

        let first = h
            .reconciler
            .run(&vec![topic("Arrays", vec![sub("Hashing", &[long])])])
            .await;
        assert_eq!(first.fallbacks, 1);

        let second = h
            .reconciler
            .run(&vec![topic("Arrays", vec![sub("Hashing", &[url("two-sum")])])])
            .await;
        assert_eq!(second.problems_created, 0);
        assert_eq!(second.problems_skipped, 1);

        let arrays = h.repo.list_topics().await.unwrap().remove(0);
        let hashing = h.repo.list_subtopics(arrays.id).await.unwrap().remove(0);
        let urls: Vec<_> = h
            .repo
            .list_problems(hashing.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.canonical_url)
            .collect();
        assert_eq!(urls, vec![url("two-sum")]);
    }

    #[tokio::test]
    async fn fetched_difficulty_is_persisted() {
        let fetcher = StubFetcher::new().with_difficulty("trapping-rain-water", Difficulty::Hard);
        let h = harness(fetcher).await;
        let snap = vec![topic(
            "Arrays",
            vec![sub("Two Pointers", &[url("trapping-rain-water"), url("3sum")])],
        )];

        h.reconciler.run(&snap).await;

        let arrays = h.repo.list_topics().await.unwrap().remove(0);
        let pointers = h.repo.list_subtopics(arrays.id).await.unwrap().remove(0);
        let difficulties: Vec<_> = h
            .repo
            .list_problems(pointers.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.difficulty)
            .collect();
        assert_eq!(difficulties, vec![Difficulty::Hard, Difficulty::Medium]);
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_fallback_and_continues() {
        let h = harness(StubFetcher::new().failing("broken-one")).await;
        let urls = [url("first-one"), url("broken-one"), url("third-one")];
        let snap = vec![topic("Arrays", vec![sub("Mixed", &urls)])];

        let report = h.reconciler.run(&snap).await;
        assert_eq!(report.problems_created, 3);
        assert_eq!(report.fallbacks, 1);
        assert_eq!(report.errors, 0);

        let mixed_topic = h.repo.list_topics().await.unwrap().remove(0);
        let mixed = h.repo.list_subtopics(mixed_topic.id).await.unwrap().remove(0);
        let problems = h.repo.list_problems(mixed.id).await.unwrap();

        assert_eq!(problems[0].title, "First One (fetched)");
        assert_eq!(problems[1].title, "Broken One");
        assert_eq!(problems[1].difficulty, Difficulty::Easy);
        assert_eq!(problems[2].title, "Third One (fetched)");
        // every fetch attempt, failed or not, is called exactly once
        assert_eq!(h.fetcher.calls(), urls.to_vec());
        assert_eq!(h.throttle.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn foreign_urls_skip_the_fetcher() {
        let h = harness(StubFetcher::new()).await;
        let foreign = "https://codeforces.com/problemset/problem/4/A-watermelon".to_string();
        let snap = vec![topic("Misc", vec![sub("Other Judges", &[foreign])])];

        let report = h.reconciler.run(&snap).await;
        assert_eq!(report.problems_created, 1);
        assert_eq!(report.fallbacks, 1);
        assert!(h.fetcher.calls().is_empty());
        assert_eq!(h.throttle.0.load(Ordering::SeqCst), 0);

        let misc = h.repo.list_topics().await.unwrap().remove(0);
        let other = h.repo.list_subtopics(misc.id).await.unwrap().remove(0);
        let problem = h.repo.list_problems(other.id).await.unwrap().remove(0);
        assert_eq!(problem.title, "A Watermelon");
        assert_eq!(
            problem.canonical_url,
            "https://codeforces.com/problemset/problem/4/A-watermelon/"
        );
    }

    #[tokio::test]
    async fn subtopic_names_match_case_sensitively() {
        let h = harness(StubFetcher::new()).await;
        h.reconciler
            .run(&vec![topic("Arrays", vec![sub("Two Pointers", &[])])])
            .await;
        let report = h
            .reconciler
            .run(&vec![topic("Arrays", vec![sub("two pointers", &[])])])
            .await;

        assert_eq!(report.topics_created, 0);
        assert_eq!(report.subtopics_created, 1);
        let arrays = h.repo.list_topics().await.unwrap().remove(0);
        assert_eq!(h.repo.list_subtopics(arrays.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn existing_rows_are_not_overwritten() {
        let h = harness(StubFetcher::new()).await;
        let arrays = h.repo.create_topic("Arrays").await.unwrap();
        let hashing = h
            .repo
            .create_subtopic(arrays.id, "Hashing", "my notes")
            .await
            .unwrap();
        let problem = h
            .repo
            .create_problem(hashing.id, "My Title", &url("two-sum"), Difficulty::Hard)
            .await
            .unwrap();
        h.repo.toggle_done(problem.id).await.unwrap();

        h.reconciler
            .run(&vec![topic("Arrays", vec![sub("Hashing", &[url("two-sum")])])])
            .await;

        let kept = h.repo.get_problem(problem.id).await.unwrap().unwrap();
        assert_eq!(kept.title, "My Title");
        assert_eq!(kept.difficulty, Difficulty::Hard);
        assert!(kept.is_done);
        let kept_sub = h.repo.get_subtopic(hashing.id).await.unwrap().unwrap();
        assert_eq!(kept_sub.description, "my notes");
    }

    #[tokio::test]
    async fn load_snapshot_treats_missing_and_malformed_as_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_snapshot(&dir.path().join("absent.json")).await.is_none());

        let bad = dir.path().join("bad.json");
        tokio::fs::write(&bad, "{ not json").await.unwrap();
        assert!(load_snapshot(&bad).await.is_none());

        let good = dir.path().join("good.json");
        tokio::fs::write(&good, r#"[{"topic": "Arrays", "subtopics": []}]"#)
            .await
            .unwrap();
        assert_eq!(load_snapshot(&good).await.unwrap().len(), 1);
    }
}
