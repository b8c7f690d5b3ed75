use std::collections::HashSet;
use std::path::PathBuf;

use discovery_core::{new_keywords, RunTrigger};
use discovery_logging::discovery_info;

use crate::{DiscoveryError, KeywordSource, StateStore};

/// Detects keywords in the source that have never been scheduled.
///
/// Read-only: it never writes the state file.
#[derive(Debug, Clone)]
pub struct TriggerSensor {
    source: KeywordSource,
    states: StateStore,
}

impl TriggerSensor {
    pub fn new(keywords_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            source: KeywordSource::new(keywords_path),
            states: StateStore::new(state_path),
        }
    }

    /// `None` when the source is missing or holds nothing new.
    pub fn poll(&self) -> Result<Option<RunTrigger>, DiscoveryError> {
        let Some(keywords) = self.source.read_if_present()? else {
            return Ok(None);
        };
        let states = self.states.load()?;
        let trigger = RunTrigger::for_keywords(new_keywords(&keywords, &states));
        if let Some(trigger) = &trigger {
            discovery_info!("New keywords detected: {:?}", trigger.keywords);
        }
        Ok(trigger)
    }
}

/// Admits each trigger key at most once.
#[derive(Debug, Default)]
pub struct TriggerGate {
    admitted: HashSet<String>,
}

impl TriggerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, trigger: &RunTrigger) -> bool {
        self.admitted.insert(trigger.key.clone())
    }
}
