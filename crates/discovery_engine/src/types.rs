use std::io;

use discovery_core::{Keyword, TransitionError};
use thiserror::Error;

use crate::PersistError;

/// Failure of the external search capability for one keyword.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to start search process: {0}")]
    Spawn(io::Error),
    #[error("failed to read search output: {0}")]
    Io(#[from] io::Error),
    #[error("malformed search entry: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("search process exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("search provider error: {0}")]
    Provider(String),
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistError),
    #[error(transparent)]
    State(#[from] TransitionError),
}

impl DiscoveryError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        DiscoveryError::Configuration(message.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    RunStarted {
        pending: usize,
    },
    KeywordDispatched {
        keyword: Keyword,
    },
    KeywordCompleted {
        keyword: Keyword,
        accepted: usize,
        duration: f64,
    },
    KeywordFailed {
        keyword: Keyword,
        reason: String,
    },
    SnapshotFlushed {
        videos_count: usize,
        total_duration: f64,
    },
}
