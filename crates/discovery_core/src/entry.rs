use serde::{Deserialize, Serialize};

/// One result returned by the search capability. Read-only input to filtering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateEntry {
    pub url: String,
    pub title: String,
    /// Seconds.
    pub duration: f64,
    pub categories: Vec<String>,
    pub subtitle_languages: Vec<String>,
}

/// An accepted search result as written to the metadata snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub title: String,
    pub url: String,
    pub duration: f64,
}

impl VideoRecord {
    pub fn from_entry(entry: &CandidateEntry) -> Self {
        Self {
            title: entry.title.clone(),
            url: entry.url.clone(),
            duration: entry.duration,
        }
    }
}
