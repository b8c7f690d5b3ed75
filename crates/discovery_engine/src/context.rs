use std::sync::{Mutex, MutexGuard, PoisonError};

use discovery_core::{DedupIndex, KeywordStates, KeywordStatus, ProgressSnapshot, VideoRecord};
use discovery_logging::discovery_error;

use crate::{DiscoveryError, SnapshotStore, StateStore};

/// Shared run state: the dedup index, keyword states and the merged snapshot,
/// together with the stores they are flushed to.
///
/// Every mutation happens under one lock, so a flush never observes a
/// half-merged worker result.
pub struct DiscoveryContext {
    shared: Mutex<Shared>,
    state_store: StateStore,
    snapshot_store: SnapshotStore,
}

struct Shared {
    states: KeywordStates,
    dedup: DedupIndex,
    /// Urls written to the url list: rehydrated ones plus merged records.
    listed: Vec<String>,
    snapshot: ProgressSnapshot,
}

impl DiscoveryContext {
    /// Loads keyword states and rehydrates the dedup index from disk.
    pub fn open(
        state_store: StateStore,
        snapshot_store: SnapshotStore,
    ) -> Result<Self, DiscoveryError> {
        let states = state_store.load()?;
        let rehydrated = snapshot_store.load()?;
        let dedup = rehydrated.urls.iter().collect();
        Ok(Self {
            shared: Mutex::new(Shared {
                states,
                dedup,
                listed: rehydrated.urls,
                snapshot: rehydrated.snapshot,
            }),
            state_store,
            snapshot_store,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn states(&self) -> KeywordStates {
        self.lock().states.clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().snapshot.clone()
    }

    /// Atomically records `url`; `false` if another worker or an earlier run owns it.
    pub fn claim_url(&self, url: &str) -> bool {
        self.lock().dedup.insert_if_absent(url)
    }

    /// Gives back urls claimed by a worker whose records will not be merged.
    pub fn release_urls<'a>(&self, urls: impl IntoIterator<Item = &'a str>) {
        let mut shared = self.lock();
        for url in urls {
            shared.dedup.remove(url);
        }
    }

    /// Marks `keyword` in progress and persists the states before any work is dispatched.
    pub fn begin_keyword(&self, keyword: &str) -> Result<(), DiscoveryError> {
        let mut shared = self.lock();
        shared.states.set_status(keyword, KeywordStatus::InProgress)?;
        self.state_store.save(&shared.states).map_err(|err| {
            discovery_error!("Failed to persist keyword states: {}", err);
            DiscoveryError::from(err)
        })
    }

    /// Merges a finished keyword's records, flushes the snapshot and marks it done.
    /// Returns the snapshot's `(videos_count, total_duration)` after the merge.
    ///
    /// The snapshot is written before the state file so a crash in between
    /// never loses merged records.
    pub fn complete_keyword(
        &self,
        keyword: &str,
        records: Vec<VideoRecord>,
    ) -> Result<(usize, f64), DiscoveryError> {
        let mut shared = self.lock();
        let shared = &mut *shared;
        for record in records {
            shared.listed.push(record.url.clone());
            shared.snapshot.push(record);
        }
        shared.states.set_status(keyword, KeywordStatus::Done)?;

        self.snapshot_store
            .flush(&shared.listed, &shared.snapshot)
            .map_err(|err| {
                discovery_error!(
                    "Failed to flush snapshot to {:?}: {}",
                    self.snapshot_store.metadata_path(),
                    err
                );
                DiscoveryError::from(err)
            })?;
        self.state_store.save(&shared.states).map_err(|err| {
            discovery_error!(
                "Failed to persist keyword states to {:?}: {}",
                self.state_store.path(),
                err
            );
            DiscoveryError::from(err)
        })?;
        Ok((shared.snapshot.videos_count, shared.snapshot.total_duration))
    }
}
