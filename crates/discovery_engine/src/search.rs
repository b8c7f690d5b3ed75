use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use chrono::NaiveDate;
use discovery_core::CandidateEntry;
use discovery_logging::{discovery_debug, discovery_trace};
use futures_util::stream::{self, Stream};
use serde::de::IgnoredAny;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::{ProxyPool, SearchError};

/// Finite, single-pass sequence of search results. Any item may be an error.
pub type CandidateStream = Pin<Box<dyn Stream<Item = Result<CandidateEntry, SearchError>> + Send>>;

/// The external search capability: a query and a result cap in, candidates out.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, cap: usize) -> Result<CandidateStream, SearchError>;
}

#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub program: PathBuf,
    /// Only uploads on or after this date.
    pub date_after: Option<NaiveDate>,
}

impl Default for YtDlpSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            date_after: NaiveDate::from_ymd_opt(2020, 1, 1),
        }
    }
}

/// Runs `yt-dlp` in metadata-only mode and streams its JSON lines.
#[derive(Debug)]
pub struct YtDlpSearch {
    settings: YtDlpSettings,
    proxies: ProxyPool,
}

impl YtDlpSearch {
    pub fn new(settings: YtDlpSettings, proxies: ProxyPool) -> Self {
        Self { settings, proxies }
    }

    fn args(&self, query: &str, cap: usize, proxy: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(date) = self.settings.date_after {
            args.push("--dateafter".to_string());
            args.push(date.format("%Y%m%d").to_string());
        }
        if let Some(proxy) = proxy {
            args.push("--geo-verification-proxy".to_string());
            args.push(proxy.to_string());
        }
        args.push(format!("ytsearch{cap}:{query}"));
        args
    }
}

#[async_trait::async_trait]
impl SearchProvider for YtDlpSearch {
    async fn search(&self, query: &str, cap: usize) -> Result<CandidateStream, SearchError> {
        let args = self.args(query, cap, self.proxies.next());
        discovery_debug!("Running {:?} {:?}", self.settings.program, args);

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SearchError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SearchError::Provider("stdout not captured".into()))?;
        // Drained concurrently so a chatty stderr cannot block stdout.
        let stderr = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = BufReader::new(stderr).read_to_string(&mut text).await;
                text
            })
        });

        let output = ProcessOutput {
            lines: BufReader::new(stdout).lines(),
            child: Some(child),
            stderr,
            finished: false,
        };
        Ok(Box::pin(stream::unfold(output, next_entry)))
    }
}

struct ProcessOutput {
    lines: Lines<BufReader<ChildStdout>>,
    child: Option<Child>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

async fn next_entry(
    mut output: ProcessOutput,
) -> Option<(Result<CandidateEntry, SearchError>, ProcessOutput)> {
    if output.finished {
        return None;
    }
    loop {
        match output.lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                return Some((parse_entry(&line), output));
            }
            Ok(None) => {
                output.finished = true;
                let mut child = output.child.take()?;
                let status = match child.wait().await {
                    Ok(status) => status,
                    Err(err) => return Some((Err(err.into()), output)),
                };
                if status.success() {
                    return None;
                }
                let stderr = match output.stderr.take() {
                    Some(handle) => handle.await.unwrap_or_default(),
                    None => String::new(),
                };
                let err = SearchError::Exit {
                    status: status.to_string(),
                    stderr: stderr.trim().to_string(),
                };
                return Some((Err(err), output));
            }
            Err(err) => {
                output.finished = true;
                return Some((Err(err.into()), output));
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    categories: Option<Vec<String>>,
    #[serde(default)]
    subtitles: Option<HashMap<String, IgnoredAny>>,
}

fn parse_entry(line: &str) -> Result<CandidateEntry, SearchError> {
    let raw: YtDlpEntry = serde_json::from_str(line)?;
    discovery_trace!("Decoded entry {:?} ({:?})", raw.webpage_url, raw.title);
    Ok(CandidateEntry {
        url: raw.webpage_url.unwrap_or_default(),
        title: raw.title.unwrap_or_default(),
        duration: raw.duration.unwrap_or(0.0),
        categories: raw.categories.unwrap_or_default(),
        subtitle_languages: raw
            .subtitles
            .map(|subtitles| subtitles.into_keys().collect())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_cap_date_and_proxy() {
        let search = YtDlpSearch::new(YtDlpSettings::default(), ProxyPool::default());
        let args = search.args("طبخ", 25, Some("http://proxy:8080"));
        assert_eq!(
            args,
            vec![
                "--dump-json",
                "--skip-download",
                "--no-warnings",
                "--dateafter",
                "20200101",
                "--geo-verification-proxy",
                "http://proxy:8080",
                "ytsearch25:طبخ",
            ]
        );
    }

    #[test]
    fn args_without_cutoff_or_proxy() {
        let settings = YtDlpSettings {
            date_after: None,
            ..YtDlpSettings::default()
        };
        let search = YtDlpSearch::new(settings, ProxyPool::default());
        let args = search.args("news", 5, None);
        assert_eq!(args.last().map(String::as_str), Some("ytsearch5:news"));
        assert!(!args.iter().any(|arg| arg == "--dateafter"));
    }

    #[test]
    fn entry_maps_subtitle_keys_and_nulls() {
        let line = r#"{"webpage_url":"https://www.youtube.com/watch?v=x","title":"عنوان","duration":null,"categories":["Education"],"subtitles":{"ar":[{"ext":"vtt"}],"en":[]}}"#;
        let entry = parse_entry(line).unwrap();
        assert_eq!(entry.url, "https://www.youtube.com/watch?v=x");
        assert_eq!(entry.duration, 0.0);
        assert_eq!(entry.categories, vec!["Education"]);
        let mut langs = entry.subtitle_languages;
        langs.sort();
        assert_eq!(langs, vec!["ar", "en"]);
    }

    #[test]
    fn malformed_line_is_a_decode_error() {
        assert!(matches!(parse_entry("not json"), Err(SearchError::Decode(_))));
    }
}
