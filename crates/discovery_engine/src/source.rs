use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use discovery_core::{parse_keywords, Keyword};

use crate::DiscoveryError;

/// Newline-delimited keyword file.
#[derive(Debug, Clone)]
pub struct KeywordSource {
    path: PathBuf,
}

impl KeywordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keywords for a run; the file must exist.
    pub fn read(&self) -> Result<Vec<Keyword>, DiscoveryError> {
        match self.read_if_present()? {
            Some(keywords) => Ok(keywords),
            None => Err(DiscoveryError::configuration(format!(
                "keyword source {} not found",
                self.path.display()
            ))),
        }
    }

    /// `None` when the file does not exist yet.
    pub fn read_if_present(&self) -> Result<Option<Vec<Keyword>>, DiscoveryError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(parse_keywords(&text))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DiscoveryError::configuration(format!(
                "failed to read keyword source {}: {err}",
                self.path.display()
            ))),
        }
    }
}
