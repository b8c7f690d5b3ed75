use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use discovery_core::{FilterPolicy, Keyword, KeywordStatus};
use discovery_logging::discovery_info;
use futures_util::stream::{self, StreamExt};

use crate::{
    DiscoveryContext, DiscoveryError, DiscoveryEvent, NullProgressSink, ProgressSink,
    SearchProvider, SearchWorker, SnapshotStore, StateStore,
};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on keywords searched at once.
    pub workers: usize,
    pub max_results: usize,
    pub policy: FilterPolicy,
    pub state_path: PathBuf,
    pub url_list_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl CoordinatorConfig {
    /// Config with default worker count and result cap, storing everything under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>, policy: FilterPolicy) -> Self {
        let dir = dir.into();
        Self {
            workers: DEFAULT_WORKERS,
            max_results: DEFAULT_MAX_RESULTS,
            policy,
            state_path: dir.join("search_states.json"),
            url_list_path: dir.join("urls.txt"),
            metadata_path: dir.join("videos_info.json"),
        }
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state_path)
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.url_list_path, &self.metadata_path)
    }
}

/// Outcome of one coordinator run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub dispatched: usize,
    /// In completion order.
    pub completed: Vec<Keyword>,
    pub failed: Vec<Keyword>,
    /// Source keywords still marked in progress after the run.
    pub in_progress: Vec<Keyword>,
    pub new_videos: usize,
    pub new_duration: f64,
    pub videos_count: usize,
    pub total_duration: f64,
}

/// Fans the unseen keywords of a source out to a bounded set of search
/// workers and merges their results into the persisted snapshot.
pub struct Coordinator {
    config: CoordinatorConfig,
    provider: Arc<dyn SearchProvider>,
    sink: Arc<dyn ProgressSink>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            config,
            provider,
            sink: Arc::new(NullProgressSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs every keyword in `keywords` that has no recorded status.
    ///
    /// Keyword-level search failures are reported, not returned; load and
    /// persistence failures abort the run.
    pub async fn run(&self, keywords: &[Keyword]) -> Result<RunReport, DiscoveryError> {
        let context = Arc::new(DiscoveryContext::open(
            self.config.state_store(),
            self.config.snapshot_store(),
        )?);
        let before = context.snapshot();
        let pending: Vec<Keyword> = context
            .states()
            .pending(keywords)
            .into_iter()
            .cloned()
            .collect();

        let mut report = RunReport {
            dispatched: pending.len(),
            ..RunReport::default()
        };
        if pending.is_empty() {
            discovery_info!("No unseen keywords among {} in source", keywords.len());
        } else {
            discovery_info!(
                "Processing {} keywords with {} workers",
                pending.len(),
                self.config.workers
            );
        }

        self.sink.emit(DiscoveryEvent::RunStarted {
            pending: pending.len(),
        });
        for keyword in &pending {
            context.begin_keyword(keyword)?;
            self.sink.emit(DiscoveryEvent::KeywordDispatched {
                keyword: keyword.clone(),
            });
        }

        let worker = SearchWorker::new(self.provider.clone(), context.clone());
        let max_results = self.config.max_results;
        let policy = &self.config.policy;
        let mut harvests = stream::iter(pending)
            .map(|keyword| worker.run(keyword, max_results, policy))
            .buffer_unordered(self.config.workers.max(1));

        while let Some(harvest) = harvests.next().await {
            if let Some(err) = harvest.failure {
                self.sink.emit(DiscoveryEvent::KeywordFailed {
                    keyword: harvest.keyword.clone(),
                    reason: err.to_string(),
                });
                report.failed.push(harvest.keyword);
                continue;
            }

            let accepted = harvest.accepted.len();
            let (videos_count, total_duration) =
                context.complete_keyword(&harvest.keyword, harvest.accepted)?;
            self.sink.emit(DiscoveryEvent::KeywordCompleted {
                keyword: harvest.keyword.clone(),
                accepted,
                duration: harvest.total_duration,
            });
            self.sink.emit(DiscoveryEvent::SnapshotFlushed {
                videos_count,
                total_duration,
            });
            report.completed.push(harvest.keyword);
        }

        let states = context.states();
        let mut seen = HashSet::new();
        report.in_progress = keywords
            .iter()
            .filter(|keyword| states.status(keyword) == KeywordStatus::InProgress)
            .filter(|keyword| seen.insert(keyword.as_str()))
            .cloned()
            .collect();

        let after = context.snapshot();
        report.new_videos = after.videos_count - before.videos_count;
        report.new_duration = after.total_duration - before.total_duration;
        report.videos_count = after.videos_count;
        report.total_duration = after.total_duration;
        discovery_info!(
            "Updated total duration: {} seconds ({} videos)",
            report.total_duration,
            report.videos_count
        );
        Ok(report)
    }
}
