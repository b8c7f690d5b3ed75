use std::collections::BTreeSet;

use crate::{Keyword, KeywordStates};

/// Scheduling signal for a run over newly added keywords.
///
/// The key depends only on the sorted keyword set, so repeated polls over the
/// same unconsumed keywords yield the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunTrigger {
    pub key: String,
    pub keywords: Vec<Keyword>,
}

impl RunTrigger {
    /// Returns `None` when there is nothing new to schedule.
    pub fn for_keywords(new: BTreeSet<Keyword>) -> Option<Self> {
        if new.is_empty() {
            return None;
        }
        let keywords: Vec<Keyword> = new.into_iter().collect();
        Some(Self {
            key: keywords.join("_"),
            keywords,
        })
    }
}

/// Keywords in `source` with no recorded status.
pub fn new_keywords(source: &[Keyword], states: &KeywordStates) -> BTreeSet<Keyword> {
    source
        .iter()
        .filter(|keyword| !states.contains(keyword))
        .cloned()
        .collect()
}
