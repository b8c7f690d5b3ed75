use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use discovery_core::{KeywordStates, ProgressSnapshot};
use discovery_logging::{discovery_info, discovery_warn};

use crate::persist::{write_atomic, PersistError};
use crate::DiscoveryError;

/// Durable keyword -> status mapping, stored as a JSON object.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty mapping; an unreadable or unparsable one is a
    /// configuration error.
    pub fn load(&self) -> Result<KeywordStates, DiscoveryError> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(KeywordStates::new());
        };
        serde_json::from_str(&content).map_err(|err| {
            DiscoveryError::configuration(format!(
                "corrupt state file {}: {err}",
                self.path.display()
            ))
        })
    }

    /// Rewrites the whole file.
    pub fn save(&self, states: &KeywordStates) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(states)?;
        write_atomic(&self.path, &content)
    }
}

/// Persisted view loaded at startup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rehydrated {
    /// Union of the url list file and the snapshot's urls, without repeats.
    pub urls: Vec<String>,
    pub snapshot: ProgressSnapshot,
}

/// The url list and metadata files consumed by the acquisition stage.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    url_list: PathBuf,
    metadata: PathBuf,
}

impl SnapshotStore {
    pub fn new(url_list: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            url_list: url_list.into(),
            metadata: metadata.into(),
        }
    }

    pub fn url_list_path(&self) -> &Path {
        &self.url_list
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata
    }

    pub fn load(&self) -> Result<Rehydrated, DiscoveryError> {
        let listed = read_optional(&self.url_list)?.unwrap_or_default();

        let snapshot = match read_optional(&self.metadata)? {
            Some(content) => {
                let stored: ProgressSnapshot = serde_json::from_str(&content).map_err(|err| {
                    DiscoveryError::configuration(format!(
                        "corrupt metadata snapshot {}: {err}",
                        self.metadata.display()
                    ))
                })?;
                let replayed = ProgressSnapshot::from_videos(stored.videos);
                if (replayed.total_duration - stored.total_duration).abs() > 1e-6
                    || replayed.videos_count != stored.videos_count
                {
                    discovery_warn!(
                        "Snapshot aggregates in {:?} disagree with its videos; recomputed to {} videos / {}s",
                        self.metadata,
                        replayed.videos_count,
                        replayed.total_duration
                    );
                }
                replayed
            }
            None => ProgressSnapshot::new(),
        };

        let mut seen = HashSet::new();
        let urls: Vec<String> = listed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .chain(snapshot.urls())
            .filter(|url| seen.insert(*url))
            .map(ToOwned::to_owned)
            .collect();

        discovery_info!(
            "Rehydrated {} urls and {} videos from {:?}",
            urls.len(),
            snapshot.videos_count,
            self.url_list.parent().unwrap_or(&self.url_list)
        );
        Ok(Rehydrated { urls, snapshot })
    }

    /// Rewrites both files from the given state.
    pub fn flush(&self, urls: &[String], snapshot: &ProgressSnapshot) -> Result<(), PersistError> {
        // Metadata first; rehydration repairs a url list that lags behind it.
        let metadata = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.metadata, &metadata)?;

        let mut listing = String::with_capacity(urls.iter().map(|url| url.len() + 1).sum());
        for url in urls {
            listing.push_str(url);
            listing.push('\n');
        }
        write_atomic(&self.url_list, &listing)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, DiscoveryError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(DiscoveryError::configuration(format!(
            "failed to read {}: {err}",
            path.display()
        ))),
    }
}
