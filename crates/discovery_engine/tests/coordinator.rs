use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use discovery_core::{CandidateEntry, FilterPolicy, KeywordStatus, ProgressSnapshot};
use discovery_engine::{
    CandidateStream, Coordinator, CoordinatorConfig, DiscoveryError, DiscoveryEvent,
    ProgressSink, SearchError, SearchProvider, StateStore,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct Plan {
    entries: Vec<CandidateEntry>,
    delay: Duration,
    fail_after: Option<usize>,
}

/// Deterministic in-memory search provider.
#[derive(Default)]
struct ScriptedSearch {
    plans: HashMap<String, Plan>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSearch {
    fn with(mut self, keyword: &str, plan: Plan) -> Self {
        self.plans.insert(keyword.to_string(), plan);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, cap: usize) -> Result<CandidateStream, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let plan = self.plans.get(query).cloned().unwrap_or_default();
        tokio::time::sleep(plan.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut items: Vec<Result<CandidateEntry, SearchError>> =
            plan.entries.into_iter().take(cap).map(Ok).collect();
        if let Some(count) = plan.fail_after {
            items.truncate(count);
            items.push(Err(SearchError::Provider("quota exceeded".into())));
        }
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<DiscoveryEvent>>,
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: DiscoveryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn entry(url: &str, duration: f64) -> CandidateEntry {
    CandidateEntry {
        url: url.to_string(),
        title: format!("برنامج {url}"),
        duration,
        categories: vec!["Entertainment".to_string()],
        subtitle_languages: vec!["ar".to_string()],
    }
}

/// Replaces the metadata file with a directory whenever `keyword` is searched.
struct MetadataSaboteur {
    keyword: String,
    metadata_path: PathBuf,
    inner: ScriptedSearch,
}

#[async_trait::async_trait]
impl SearchProvider for MetadataSaboteur {
    async fn search(&self, query: &str, cap: usize) -> Result<CandidateStream, SearchError> {
        if query == self.keyword {
            fs::create_dir_all(&self.metadata_path)?;
        }
        self.inner.search(query, cap).await
    }
}

fn plan(entries: Vec<CandidateEntry>) -> Plan {
    Plan {
        entries,
        ..Plan::default()
    }
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn config(dir: &Path) -> CoordinatorConfig {
    CoordinatorConfig::in_dir(dir.join("url_list"), FilterPolicy::for_language("ar"))
}

fn coordinator(dir: &Path, provider: &Arc<ScriptedSearch>) -> Coordinator {
    let provider: Arc<dyn SearchProvider> = provider.clone();
    Coordinator::new(config(dir), provider)
}

fn listed_urls(dir: &Path) -> Vec<String> {
    fs::read_to_string(config(dir).url_list_path)
        .unwrap_or_default()
        .lines()
        .map(ToOwned::to_owned)
        .collect()
}

fn metadata(dir: &Path) -> ProgressSnapshot {
    let raw = fs::read_to_string(config(dir).metadata_path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn assert_dedup_invariant(dir: &Path) {
    let urls = listed_urls(dir);
    let distinct: HashSet<_> = urls.iter().collect();
    assert_eq!(distinct.len(), urls.len(), "url list repeats a url");
    let snapshot = metadata(dir);
    assert_eq!(snapshot.videos_count, distinct.len());
    assert_eq!(snapshot.videos_count, snapshot.videos.len());
}

fn init_logging() {
    discovery_logging::initialize_for_tests();
}

#[tokio::test]
async fn run_persists_accepted_videos_and_marks_keywords_done() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedSearch::default()
            .with("a", plan(vec![entry("https://v/1", 120.0), entry("https://v/2", 30.0)]))
            .with("b", plan(vec![entry("https://v/3", 60.0)])),
    );

    let report = coordinator(temp.path(), &provider)
        .run(&keywords(&["a", "b"]))
        .await
        .unwrap();

    let mut completed = report.completed.clone();
    completed.sort();
    assert_eq!(completed, keywords(&["a", "b"]));
    assert!(report.failed.is_empty());
    assert_eq!(report.new_videos, 2);
    assert_eq!(report.total_duration, 180.0);

    let mut urls = listed_urls(temp.path());
    urls.sort();
    assert_eq!(urls, vec!["https://v/1", "https://v/3"]);
    assert_eq!(metadata(temp.path()).total_duration, 180.0);
    assert_dedup_invariant(temp.path());

    let states = StateStore::new(config(temp.path()).state_path).load().unwrap();
    assert_eq!(states.status("a"), KeywordStatus::Done);
    assert_eq!(states.status("b"), KeywordStatus::Done);
}

#[tokio::test]
async fn rerun_over_done_keywords_makes_no_search_calls() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedSearch::default().with("a", plan(vec![entry("https://v/1", 90.0)])),
    );
    coordinator(temp.path(), &provider)
        .run(&keywords(&["a"]))
        .await
        .unwrap();
    let urls_before = fs::read(config(temp.path()).url_list_path).unwrap();
    let meta_before = fs::read(config(temp.path()).metadata_path).unwrap();

    let second = Arc::new(
        ScriptedSearch::default().with("a", plan(vec![entry("https://v/9", 90.0)])),
    );
    let report = coordinator(temp.path(), &second)
        .run(&keywords(&["a"]))
        .await
        .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.new_videos, 0);
    assert_eq!(fs::read(config(temp.path()).url_list_path).unwrap(), urls_before);
    assert_eq!(fs::read(config(temp.path()).metadata_path).unwrap(), meta_before);
}

#[tokio::test]
async fn shared_url_is_kept_once_in_either_completion_order() {
    init_logging();
    for (delay_a, delay_b) in [(5, 40), (40, 5)] {
        let temp = TempDir::new().unwrap();
        let shared = entry("https://v/shared", 100.0);
        let provider = Arc::new(
            ScriptedSearch::default()
                .with(
                    "a",
                    Plan {
                        entries: vec![shared.clone(), entry("https://v/a", 70.0)],
                        delay: Duration::from_millis(delay_a),
                        fail_after: None,
                    },
                )
                .with(
                    "b",
                    Plan {
                        entries: vec![entry("https://v/b", 80.0), shared.clone()],
                        delay: Duration::from_millis(delay_b),
                        fail_after: None,
                    },
                ),
        );

        coordinator(temp.path(), &provider)
            .run(&keywords(&["a", "b"]))
            .await
            .unwrap();

        let snapshot = metadata(temp.path());
        let shared_records = snapshot
            .videos
            .iter()
            .filter(|video| video.url == "https://v/shared")
            .count();
        assert_eq!(shared_records, 1);
        assert_eq!(snapshot.total_duration, 250.0);
        assert_dedup_invariant(temp.path());
    }
}

#[tokio::test]
async fn failed_keyword_stays_in_progress_and_is_not_rescheduled() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedSearch::default()
            .with(
                "broken",
                Plan {
                    entries: vec![entry("https://v/partial", 300.0)],
                    fail_after: Some(1),
                    ..Plan::default()
                },
            )
            .with("fine", plan(vec![entry("https://v/ok", 65.0)])),
    );

    let report = coordinator(temp.path(), &provider)
        .run(&keywords(&["broken", "fine"]))
        .await
        .unwrap();

    assert_eq!(report.failed, keywords(&["broken"]));
    assert_eq!(report.completed, keywords(&["fine"]));
    assert_eq!(report.in_progress, keywords(&["broken"]));
    assert_eq!(listed_urls(temp.path()), vec!["https://v/ok"]);
    assert_dedup_invariant(temp.path());

    let states = StateStore::new(config(temp.path()).state_path).load().unwrap();
    assert_eq!(states.status("broken"), KeywordStatus::InProgress);

    let retry = Arc::new(ScriptedSearch::default());
    let report = coordinator(temp.path(), &retry)
        .run(&keywords(&["broken", "fine"]))
        .await
        .unwrap();
    assert!(retry.calls().is_empty());
    assert_eq!(report.in_progress, keywords(&["broken"]));
}

#[tokio::test]
async fn snapshot_write_failure_aborts_the_run() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let mut config = config(temp.path());
    config.url_list_path = blocker.join("urls.txt");
    config.metadata_path = blocker.join("videos_info.json");
    let state_path = config.state_path.clone();

    let provider: Arc<dyn SearchProvider> = Arc::new(
        ScriptedSearch::default().with("a", plan(vec![entry("https://v/1", 90.0)])),
    );
    let err = Coordinator::new(config, provider)
        .run(&keywords(&["a"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::Persistence(_)));
    let states = StateStore::new(state_path).load().unwrap();
    assert_eq!(states.status("a"), KeywordStatus::InProgress);
}

#[tokio::test]
async fn resumed_run_over_extended_source_matches_single_run() {
    init_logging();
    let all = keywords(&["k1", "k2", "k3", "k4"]);
    let provider = || {
        Arc::new(
            ScriptedSearch::default()
                .with("k1", plan(vec![entry("https://v/1", 61.0), entry("https://v/2", 62.0)]))
                .with("k2", plan(vec![entry("https://v/2", 62.0), entry("https://v/3", 63.0)]))
                .with("k3", plan(vec![entry("https://v/4", 64.0)]))
                .with("k4", plan(vec![entry("https://v/1", 61.0), entry("https://v/5", 65.0)])),
        )
    };

    let straight = TempDir::new().unwrap();
    coordinator(straight.path(), &provider())
        .run(&all)
        .await
        .unwrap();

    let resumed = TempDir::new().unwrap();
    coordinator(resumed.path(), &provider())
        .run(&all[..2])
        .await
        .unwrap();
    let second = provider();
    coordinator(resumed.path(), &second).run(&all).await.unwrap();

    let mut remaining = second.calls();
    remaining.sort();
    assert_eq!(remaining, keywords(&["k3", "k4"]));

    let sorted = |dir: &Path| {
        let mut urls = listed_urls(dir);
        urls.sort();
        urls
    };
    assert_eq!(sorted(straight.path()), sorted(resumed.path()));
    assert_eq!(
        metadata(straight.path()).total_duration,
        metadata(resumed.path()).total_duration
    );
    assert_dedup_invariant(resumed.path());
}

#[tokio::test]
async fn failed_metadata_flush_leaves_no_orphan_urls() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let metadata_path = config(temp.path()).metadata_path;
    let provider: Arc<dyn SearchProvider> = Arc::new(MetadataSaboteur {
        keyword: "a".to_string(),
        metadata_path: metadata_path.clone(),
        inner: ScriptedSearch::default().with("a", plan(vec![entry("https://v/1", 90.0)])),
    });
    let err = Coordinator::new(config(temp.path()), provider)
        .run(&keywords(&["a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Persistence(_)));
    assert!(listed_urls(temp.path()).is_empty());

    fs::remove_dir(&metadata_path).unwrap();
    let provider = Arc::new(
        ScriptedSearch::default()
            .with("a", plan(vec![entry("https://v/1", 90.0)]))
            .with("b", plan(vec![entry("https://v/2", 70.0)])),
    );
    let report = coordinator(temp.path(), &provider)
        .run(&keywords(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(provider.calls(), keywords(&["b"]));
    assert_eq!(report.in_progress, keywords(&["a"]));
    assert_eq!(listed_urls(temp.path()), vec!["https://v/2"]);
    assert_eq!(metadata(temp.path()).total_duration, 70.0);
    assert_dedup_invariant(temp.path());
}

#[tokio::test]
async fn keywords_interrupted_in_progress_are_reported_not_redispatched() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let all = keywords(&["k1", "k2", "k3", "k4"]);
    let first = Arc::new(
        ScriptedSearch::default()
            .with("k1", plan(vec![entry("https://v/1", 61.0)]))
            .with("k2", plan(vec![entry("https://v/2", 62.0)])),
    );
    coordinator(temp.path(), &first)
        .run(&all[..2])
        .await
        .unwrap();

    // State as left by a run that marked k3 and k4 but stopped before their flush.
    let store = StateStore::new(config(temp.path()).state_path);
    let mut states = store.load().unwrap();
    states.set_status("k3", KeywordStatus::InProgress).unwrap();
    states.set_status("k4", KeywordStatus::InProgress).unwrap();
    store.save(&states).unwrap();
    let flushed = metadata(temp.path());

    let resumed = Arc::new(
        ScriptedSearch::default()
            .with("k3", plan(vec![entry("https://v/3", 63.0)]))
            .with("k4", plan(vec![entry("https://v/4", 64.0)])),
    );
    let report = coordinator(temp.path(), &resumed)
        .run(&all)
        .await
        .unwrap();

    assert!(resumed.calls().is_empty());
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.in_progress, keywords(&["k3", "k4"]));
    assert_eq!(report.new_videos, 0);
    assert_eq!(metadata(temp.path()), flushed);
    assert_dedup_invariant(temp.path());

    let states = store.load().unwrap();
    assert_eq!(states.status("k3"), KeywordStatus::InProgress);
    assert_eq!(states.status("k4"), KeywordStatus::InProgress);
}

#[tokio::test]
async fn worker_pool_bounds_concurrent_searches() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let names: Vec<String> = (0..6).map(|i| format!("kw{i}")).collect();
    let mut search = ScriptedSearch::default();
    for name in &names {
        search = search.with(
            name,
            Plan {
                delay: Duration::from_millis(20),
                ..Plan::default()
            },
        );
    }
    let provider = Arc::new(search);

    let mut config = config(temp.path());
    config.workers = 2;
    let dyn_provider: Arc<dyn SearchProvider> = provider.clone();
    let report = Coordinator::new(config, dyn_provider)
        .run(&names)
        .await
        .unwrap();

    assert_eq!(report.completed.len(), 6);
    assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn repeated_source_keyword_is_searched_once_and_events_are_emitted() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedSearch::default().with("a", plan(vec![entry("https://v/1", 90.0)])),
    );
    let sink = Arc::new(RecordingSink::default());
    let dyn_provider: Arc<dyn SearchProvider> = provider.clone();
    let report = Coordinator::new(config(temp.path()), dyn_provider)
        .with_sink(sink.clone())
        .run(&keywords(&["a", "a"]))
        .await
        .unwrap();

    assert_eq!(provider.calls(), keywords(&["a"]));
    assert_eq!(report.dispatched, 1);
    let events = sink.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            DiscoveryEvent::RunStarted { pending: 1 },
            DiscoveryEvent::KeywordDispatched {
                keyword: "a".to_string()
            },
            DiscoveryEvent::KeywordCompleted {
                keyword: "a".to_string(),
                accepted: 1,
                duration: 90.0
            },
            DiscoveryEvent::SnapshotFlushed {
                videos_count: 1,
                total_duration: 90.0
            },
        ]
    );
}
