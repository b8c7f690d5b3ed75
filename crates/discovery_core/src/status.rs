use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Keyword = String;

/// Lifecycle of a keyword. `Unseen` is never stored; it is the absence of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordStatus {
    #[serde(skip)]
    Unseen,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl KeywordStatus {
    fn can_become(self, next: KeywordStatus) -> bool {
        matches!(
            (self, next),
            (KeywordStatus::Unseen, KeywordStatus::InProgress)
                | (KeywordStatus::InProgress, KeywordStatus::InProgress)
                | (KeywordStatus::InProgress, KeywordStatus::Done)
                | (KeywordStatus::Done, KeywordStatus::Done)
        )
    }
}

impl fmt::Display for KeywordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordStatus::Unseen => write!(f, "unseen"),
            KeywordStatus::InProgress => write!(f, "in progress"),
            KeywordStatus::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("keyword {keyword:?} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub keyword: Keyword,
    pub from: KeywordStatus,
    pub to: KeywordStatus,
}

/// In-memory keyword -> status mapping backing the state file.
///
/// Transitions only move forward (`Unseen -> InProgress -> Done`); persisting
/// the mapping is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordStates {
    entries: BTreeMap<Keyword, KeywordStatus>,
}

impl KeywordStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, keyword: &str) -> KeywordStatus {
        self.entries
            .get(keyword)
            .copied()
            .unwrap_or(KeywordStatus::Unseen)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    pub fn set_status(
        &mut self,
        keyword: &str,
        status: KeywordStatus,
    ) -> Result<(), TransitionError> {
        let current = self.status(keyword);
        if !current.can_become(status) {
            return Err(TransitionError {
                keyword: keyword.to_string(),
                from: current,
                to: status,
            });
        }
        self.entries.insert(keyword.to_string(), status);
        Ok(())
    }

    /// Keywords from `source` that have never been scheduled, first occurrence order.
    pub fn pending<'a>(&self, source: &'a [Keyword]) -> Vec<&'a Keyword> {
        let mut seen = std::collections::HashSet::new();
        source
            .iter()
            .filter(|keyword| !self.contains(keyword))
            .filter(|keyword| seen.insert(keyword.as_str()))
            .collect()
    }

    pub fn with_status(&self, status: KeywordStatus) -> impl Iterator<Item = &Keyword> + '_ {
        self.entries
            .iter()
            .filter(move |(_, s)| **s == status)
            .map(|(keyword, _)| keyword)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
