use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::ScrapeBackend;
use crate::errors::LsqError;
use crate::models::ScrapeResults;

#[derive(Clone, Default)]
pub struct MockScraperConfig {
    pub delay_ms: u64,
    pub error: Option<String>,
    pub panic_message: Option<String>,
    pub empty: bool,
}

/// Scripted backend for tests. Tracks how many calls overlap.
pub struct MockScraper {
    config: MockScraperConfig,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_limit: Mutex<Option<usize>>,
}

impl MockScraper {
    pub fn new(config: MockScraperConfig) -> Self {
        Self {
            config,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_limit: Mutex::new(None),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(MockScraperConfig::default())
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self::new(MockScraperConfig {
            delay_ms,
            ..Default::default()
        })
    }

    pub fn failing(error: &str) -> Self {
        Self::new(MockScraperConfig {
            error: Some(error.to_string()),
            ..Default::default()
        })
    }

    pub fn panicking(message: &str) -> Self {
        Self::new(MockScraperConfig {
            panic_message: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn empty() -> Self {
        Self::new(MockScraperConfig {
            empty: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `scrape_all` calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> Option<usize> {
        self.last_limit.lock().ok().and_then(|l| *l)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScrapeBackend for MockScraper {
    fn name(&self) -> &str {
        "mock"
    }

    async fn scrape_all(
        &self,
        keywords: &str,
        platforms: &[String],
        limit: usize,
    ) -> Result<ScrapeResults, LsqError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_limit.lock() {
            *last = Some(limit);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
        }

        if let Some(ref message) = self.config.panic_message {
            panic!("{}", message);
        }

        if let Some(ref error) = self.config.error {
            return Err(LsqError::Scrape(error.clone()));
        }

        if self.config.empty {
            return Ok(ScrapeResults::new());
        }

        Ok(platforms
            .iter()
            .map(|p| {
                (
                    p.clone(),
                    serde_json::json!([{ "platform": p, "keywords": keywords }]),
                )
            })
            .collect())
    }
}
