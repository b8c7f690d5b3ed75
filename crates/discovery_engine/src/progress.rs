use std::sync::atomic::{AtomicUsize, Ordering};

use discovery_logging::{discovery_debug, discovery_info, discovery_warn};

use crate::DiscoveryEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: DiscoveryEvent);
}

#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: DiscoveryEvent) {}
}

/// Logs each event with a finished/dispatched counter.
///
/// Counters restart on every `RunStarted`, so one sink can serve a sequence
/// of runs.
#[derive(Debug, Default)]
pub struct LogProgressSink {
    dispatched: AtomicUsize,
    finished: AtomicUsize,
}

impl LogProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(finished, dispatched)` for the current run.
    pub fn position(&self) -> (usize, usize) {
        (
            self.finished.load(Ordering::Relaxed),
            self.dispatched.load(Ordering::Relaxed),
        )
    }
}

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::RunStarted { pending } => {
                self.dispatched.store(0, Ordering::Relaxed);
                self.finished.store(0, Ordering::Relaxed);
                discovery_debug!("Run started with {} pending keywords", pending);
            }
            DiscoveryEvent::KeywordDispatched { keyword } => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
                discovery_info!("Dispatched keyword {:?}", keyword);
            }
            DiscoveryEvent::KeywordCompleted {
                keyword,
                accepted,
                duration,
            } => {
                let finished = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
                discovery_info!(
                    "[{}/{}] {:?}: {} new videos, {}s",
                    finished,
                    self.dispatched.load(Ordering::Relaxed),
                    keyword,
                    accepted,
                    duration
                );
            }
            DiscoveryEvent::KeywordFailed { keyword, reason } => {
                let finished = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
                discovery_warn!(
                    "[{}/{}] {:?} failed and stays in progress: {}",
                    finished,
                    self.dispatched.load(Ordering::Relaxed),
                    keyword,
                    reason
                );
            }
            DiscoveryEvent::SnapshotFlushed {
                videos_count,
                total_duration,
            } => {
                discovery_info!(
                    "Snapshot flushed: {} videos, {}s total",
                    videos_count,
                    total_duration
                );
            }
        }
    }
}
