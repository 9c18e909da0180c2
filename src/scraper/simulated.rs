use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::ScrapeBackend;
use crate::errors::LsqError;
use crate::models::ScrapeResults;

/// Most sample records produced per platform regardless of `limit`.
const MAX_SAMPLES: usize = 5;

/// Aggregated data source that needs no browser. Produces sample records for
/// the platforms it knows and an empty list for any other platform id.
#[derive(Debug, Default)]
pub struct SimulatedScraper;

impl SimulatedScraper {
    pub fn new() -> Self {
        Self
    }

    fn people(keywords: &str, count: usize) -> Vec<Value> {
        (1..=count)
            .map(|i| {
                json!({
                    "name": format!("Prospect {}", i),
                    "title": "Study abroad consultant",
                    "company": "Sample Education Agency",
                    "location": "Beijing",
                    "profile_url": format!("https://linkedin.com/in/user{}", i),
                    "email": format!("user{}@example.com", i),
                    "phone": "",
                    "source": "linkedin",
                    "notes": format!("Matched keywords \"{}\"", keywords),
                })
            })
            .collect()
    }

    fn notes(keywords: &str, count: usize) -> Vec<Value> {
        let now = Utc::now().to_rfc3339();
        (1..=count)
            .map(|i| {
                json!({
                    "title": format!("Study abroad experience {}", i),
                    "author": format!("user{}", i),
                    "author_id": format!("user{}", i),
                    "content": format!("A note about {}...", keywords),
                    "url": format!("https://www.xiaohongshu.com/note/{}", i),
                    "likes": 100 + i * 10,
                    "comments": 20 + i * 2,
                    "published_at": now,
                    "source": "xiaohongshu",
                    "keywords": keywords,
                })
            })
            .collect()
    }

    fn questions(keywords: &str, count: usize) -> Vec<Value> {
        let now = Utc::now().to_rfc3339();
        (1..=count)
            .map(|i| {
                json!({
                    "title": format!("Question about {} {}", keywords, i),
                    "question_id": format!("q{}", i),
                    "author": format!("user{}", i),
                    "url": format!("https://www.zhihu.com/question/{}", i),
                    "answer_count": 10 + i,
                    "follower_count": 50 + i * 5,
                    "created_at": now,
                    "source": "zhihu",
                    "keywords": keywords,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ScrapeBackend for SimulatedScraper {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn scrape_all(
        &self,
        keywords: &str,
        platforms: &[String],
        limit: usize,
    ) -> Result<ScrapeResults, LsqError> {
        let count = limit.min(MAX_SAMPLES);
        let mut results = ScrapeResults::new();

        for platform in platforms {
            let records = match platform.as_str() {
                "linkedin" => Self::people(keywords, count),
                "xiaohongshu" => Self::notes(keywords, count),
                "zhihu" => Self::questions(keywords, count),
                other => {
                    tracing::debug!("No simulated data for platform '{}'", other);
                    Vec::new()
                }
            };
            results.insert(platform.clone(), Value::Array(records));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platforms(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_known_platforms_get_samples() {
        let scraper = SimulatedScraper::new();
        let results = scraper
            .scrape_all("us masters", &platforms(&["linkedin", "xiaohongshu", "zhihu"]), 10)
            .await
            .expect("scrape");

        assert_eq!(results.len(), 3);
        for records in results.values() {
            assert_eq!(records.as_array().expect("array").len(), MAX_SAMPLES);
        }
        assert_eq!(results["zhihu"][0]["keywords"], "us masters");
        assert_eq!(results["linkedin"][0]["source"], "linkedin");
    }

    #[tokio::test]
    async fn test_limit_caps_sample_count() {
        let scraper = SimulatedScraper::new();
        let results = scraper
            .scrape_all("mba", &platforms(&["xiaohongshu"]), 2)
            .await
            .expect("scrape");
        assert_eq!(results["xiaohongshu"].as_array().expect("array").len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_platform_is_present_but_empty() {
        let scraper = SimulatedScraper::new();
        let results = scraper
            .scrape_all("mba", &platforms(&["a", "b"]), 10)
            .await
            .expect("scrape");
        assert_eq!(results.len(), 2);
        assert!(results["a"].as_array().expect("array").is_empty());
        assert!(results["b"].as_array().expect("array").is_empty());
    }
}
