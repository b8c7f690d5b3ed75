use serde::{Deserialize, Serialize};

use crate::VideoRecord;

/// Metadata snapshot: every accepted record plus aggregates.
///
/// `total_duration` and `videos_count` are always the sum and count of `videos`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub videos: Vec<VideoRecord>,
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub videos_count: usize,
}

impl ProgressSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the aggregates by replaying `videos`.
    pub fn from_videos(videos: Vec<VideoRecord>) -> Self {
        let total_duration = videos.iter().map(|video| video.duration).sum();
        let videos_count = videos.len();
        Self {
            videos,
            total_duration,
            videos_count,
        }
    }

    pub fn push(&mut self, record: VideoRecord) {
        self.total_duration += record.duration;
        self.videos.push(record);
        self.videos_count = self.videos.len();
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = VideoRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> + '_ {
        self.videos.iter().map(|video| video.url.as_str())
    }
}
