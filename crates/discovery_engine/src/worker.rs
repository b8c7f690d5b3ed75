use std::sync::Arc;

use discovery_core::{evaluate, FilterPolicy, Keyword, VideoRecord};
use discovery_logging::{discovery_debug, discovery_warn};
use futures_util::StreamExt;

use crate::{DiscoveryContext, SearchError, SearchProvider};

/// Result of searching one keyword.
#[derive(Debug)]
pub struct KeywordHarvest {
    pub keyword: Keyword,
    pub accepted: Vec<VideoRecord>,
    pub total_duration: f64,
    /// Set when the search failed; `accepted` is then empty.
    pub failure: Option<SearchError>,
}

impl KeywordHarvest {
    fn completed(keyword: Keyword, accepted: Vec<VideoRecord>) -> Self {
        let total_duration = accepted.iter().map(|record| record.duration).sum();
        Self {
            keyword,
            accepted,
            total_duration,
            failure: None,
        }
    }

    fn failed(keyword: Keyword, err: SearchError) -> Self {
        Self {
            keyword,
            accepted: Vec::new(),
            total_duration: 0.0,
            failure: Some(err),
        }
    }
}

/// Searches one keyword, filters the candidates and claims new urls.
#[derive(Clone)]
pub struct SearchWorker {
    provider: Arc<dyn SearchProvider>,
    context: Arc<DiscoveryContext>,
}

impl SearchWorker {
    pub fn new(provider: Arc<dyn SearchProvider>, context: Arc<DiscoveryContext>) -> Self {
        Self { provider, context }
    }

    /// Never fails: provider errors are logged and reported in the harvest.
    pub async fn run(
        &self,
        keyword: Keyword,
        max_results: usize,
        policy: &FilterPolicy,
    ) -> KeywordHarvest {
        let mut accepted = Vec::new();
        match self
            .collect(&keyword, max_results, policy, &mut accepted)
            .await
        {
            Ok(()) => KeywordHarvest::completed(keyword, accepted),
            Err(err) => {
                discovery_warn!("Error processing keyword {:?}: {}", keyword, err);
                // Unclaim so the url list never names a record that was not merged.
                self.context
                    .release_urls(accepted.iter().map(|record| record.url.as_str()));
                KeywordHarvest::failed(keyword, err)
            }
        }
    }

    async fn collect(
        &self,
        keyword: &str,
        max_results: usize,
        policy: &FilterPolicy,
        accepted: &mut Vec<VideoRecord>,
    ) -> Result<(), SearchError> {
        let mut candidates = self.provider.search(keyword, max_results).await?;
        while let Some(candidate) = candidates.next().await {
            let entry = candidate?;
            if let Err(rejection) = evaluate(&entry, policy) {
                discovery_debug!("Rejected {:?} for {:?}: {}", entry.url, keyword, rejection);
                continue;
            }
            if !self.context.claim_url(&entry.url) {
                discovery_debug!("Already known: {}", entry.url);
                continue;
            }
            accepted.push(VideoRecord::from_entry(&entry));
        }
        Ok(())
    }
}
