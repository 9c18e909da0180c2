// Scraper facade: one capability, several interchangeable providers.
// Which provider serves jobs is decided once, at start-up.

pub mod mock;
pub mod remote;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::LsqError;
use crate::models::{DaemonConfig, ScrapeResults};

pub use mock::MockScraper;
pub use remote::RemoteBrowserScraper;
pub use simulated::SimulatedScraper;

/// Anything that can turn keywords into per-platform results.
#[async_trait]
pub trait ScrapeBackend: Send + Sync {
    /// Short provider name surfaced in logs and `/health`.
    fn name(&self) -> &str;

    async fn scrape_all(
        &self,
        keywords: &str,
        platforms: &[String],
        limit: usize,
    ) -> Result<ScrapeResults, LsqError>;
}

/// The provider selected for this process plus the per-platform limit.
#[derive(Clone)]
pub struct ScraperFacade {
    backend: Arc<dyn ScrapeBackend>,
    limit: usize,
}

impl ScraperFacade {
    pub fn new(backend: Arc<dyn ScrapeBackend>, limit: usize) -> Self {
        Self { backend, limit }
    }

    /// Probe the live browser-backed scraper and fall back to simulated data
    /// when it is not configured or not reachable.
    pub async fn detect(config: &DaemonConfig) -> Self {
        let backend: Arc<dyn ScrapeBackend> = match config.live_scraper_url.as_deref() {
            None => {
                tracing::info!("No live scraper configured, using simulated data source");
                Arc::new(SimulatedScraper::new())
            }
            Some(url) => match Self::probe_live(url, config).await {
                Ok(remote) => {
                    tracing::info!("Live scraper available at {}", url);
                    Arc::new(remote)
                }
                Err(e) => {
                    tracing::warn!("{}; falling back to simulated data source", e);
                    Arc::new(SimulatedScraper::new())
                }
            },
        };

        Self::new(backend, config.scrape_limit)
    }

    async fn probe_live(url: &str, config: &DaemonConfig) -> Result<RemoteBrowserScraper, LsqError> {
        let remote = RemoteBrowserScraper::new(url, config.request_timeout())?;
        remote.probe(config.probe_timeout()).await?;
        Ok(remote)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run one scrape against the selected provider.
    pub async fn scrape(&self, keywords: &str, platforms: &[String]) -> Result<ScrapeResults, LsqError> {
        let results = self
            .backend
            .scrape_all(keywords, platforms, self.limit)
            .await?;
        if results.is_empty() {
            return Err(LsqError::Scrape(format!(
                "{} scraper returned no results",
                self.backend.name()
            )));
        }
        Ok(results)
    }
}
