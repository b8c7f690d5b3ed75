use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use discovery_core::FilterPolicy;
use discovery_engine::{CoordinatorConfig, DiscoveryError, YtDlpSettings};
use discovery_logging::discovery_info;
use serde::{Deserialize, Serialize};

/// Pipeline settings read from the RON config file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_results: usize,
    pub language: String,
    /// Selects the proxy list from the proxy map.
    pub country: String,
    pub date_after: NaiveDate,
    pub workers: usize,
    pub min_duration_secs: f64,
    pub excluded_phrases: Vec<String>,
    pub excluded_categories: Vec<String>,
    pub poll_interval_secs: u64,
    pub yt_dlp_program: PathBuf,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub keywords: PathBuf,
    pub proxies: PathBuf,
    pub url_list: PathBuf,
    pub videos_info: PathBuf,
    pub search_states: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            keywords: PathBuf::from("keywords/keywords.txt"),
            proxies: PathBuf::from("proxies.json"),
            url_list: PathBuf::from("url_list/urls.txt"),
            videos_info: PathBuf::from("url_list/videos_info.json"),
            search_states: PathBuf::from("url_list/search_states.json"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let policy = FilterPolicy::for_language("ar");
        Self {
            max_results: 10,
            language: policy.language,
            country: "egypt".to_string(),
            date_after: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            workers: discovery_engine::DEFAULT_WORKERS,
            min_duration_secs: policy.min_duration_secs,
            excluded_phrases: policy.excluded_phrases,
            excluded_categories: policy.excluded_categories,
            poll_interval_secs: 5,
            yt_dlp_program: PathBuf::from("yt-dlp"),
            paths: PathsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Missing file means defaults; an unreadable, unparsable or invalid one is an error.
    pub fn load(path: &Path) -> Result<Self, DiscoveryError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                discovery_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(DiscoveryError::Configuration(format!(
                    "failed to read config {}: {err}",
                    path.display()
                )))
            }
        };
        Self::parse(&content)
            .map_err(|err| DiscoveryError::Configuration(format!("{}: {err}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Self = ron::from_str(content).map_err(|err| err.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_results == 0 {
            return Err("max_results must be positive".into());
        }
        if self.workers == 0 {
            return Err("workers must be positive".into());
        }
        if self.language.trim().is_empty() {
            return Err("language must not be empty".into());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be positive".into());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy {
            min_duration_secs: self.min_duration_secs,
            excluded_phrases: self.excluded_phrases.clone(),
            excluded_categories: self.excluded_categories.clone(),
            ..FilterPolicy::for_language(self.language.clone())
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            workers: self.workers,
            max_results: self.max_results,
            policy: self.filter_policy(),
            state_path: self.paths.search_states.clone(),
            url_list_path: self.paths.url_list.clone(),
            metadata_path: self.paths.videos_info.clone(),
        }
    }

    pub fn yt_dlp_settings(&self) -> YtDlpSettings {
        YtDlpSettings {
            program: self.yt_dlp_program.clone(),
            date_after: Some(self.date_after),
        }
    }
}
