use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use discovery_logging::{discovery_info, discovery_warn};

use crate::DiscoveryError;

/// Proxies for one country, handed out round-robin.
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
    next: AtomicUsize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            next: AtomicUsize::new(0),
        }
    }

    /// Loads the `{ country: [proxy, ...] }` map and keeps `country`'s entry.
    ///
    /// A missing file or unknown country yields an empty pool.
    pub fn load(path: &Path, country: &str) -> Result<Self, DiscoveryError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                discovery_warn!("Proxy map {:?} not found; searching without proxies", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(DiscoveryError::configuration(format!(
                    "failed to read proxy map {}: {err}",
                    path.display()
                )))
            }
        };
        let mut by_country: HashMap<String, Vec<String>> = serde_json::from_str(&content)
            .map_err(|err| {
                DiscoveryError::configuration(format!(
                    "corrupt proxy map {}: {err}",
                    path.display()
                ))
            })?;
        let proxies = by_country.remove(country).unwrap_or_else(|| {
            discovery_warn!("No proxies listed for country {:?} in {:?}", country, path);
            Vec::new()
        });
        discovery_info!("Loaded {} proxies for {:?}", proxies.len(), country);
        Ok(Self::new(proxies))
    }

    pub fn next(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[index].as_str())
    }
}
