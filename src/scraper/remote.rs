use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ScrapeBackend;
use crate::errors::LsqError;
use crate::models::ScrapeResults;

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    keywords: &'a str,
    platforms: &'a [String],
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    platforms: ScrapeResults,
}

/// Client for the browser-automation scraper running as a separate service.
///
/// - `GET  {base}/health` answers 2xx when a browser session can be opened.
/// - `POST {base}/scrape` takes `{keywords, platforms, limit}` and answers
///   `{"platforms": {<platform>: <payload>}}`.
pub struct RemoteBrowserScraper {
    client: Client,
    base_url: String,
}

impl RemoteBrowserScraper {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, LsqError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LsqError::BackendUnavailable(format!(
                "live scraper url '{}' is not an http(s) url",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LsqError::BackendUnavailable(format!("http client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the live scraper is up and answering.
    pub async fn probe(&self, timeout: Duration) -> Result<(), LsqError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                LsqError::BackendUnavailable(format!("live scraper at {} unreachable: {}", url, e))
            })?;

        if !response.status().is_success() {
            return Err(LsqError::BackendUnavailable(format!(
                "live scraper health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ScrapeBackend for RemoteBrowserScraper {
    fn name(&self) -> &str {
        "live"
    }

    async fn scrape_all(
        &self,
        keywords: &str,
        platforms: &[String],
        limit: usize,
    ) -> Result<ScrapeResults, LsqError> {
        let url = format!("{}/scrape", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ScrapeRequest {
                keywords,
                platforms,
                limit,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LsqError::Scrape(format!(
                "live scraper returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: ScrapeResponse = response.json().await?;
        Ok(parsed.platforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{}", addr)
    }

    async fn echo_scrape(Json(body): Json<Value>) -> Json<Value> {
        let mut platforms = serde_json::Map::new();
        for p in body["platforms"].as_array().cloned().unwrap_or_default() {
            let name = p.as_str().unwrap_or_default().to_string();
            platforms.insert(
                name,
                json!([{ "keywords": body["keywords"], "limit": body["limit"] }]),
            );
        }
        Json(json!({ "platforms": platforms }))
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = RemoteBrowserScraper::new("localhost:9515", Duration::from_secs(1));
        assert!(matches!(err, Err(LsqError::BackendUnavailable(_))));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let remote =
            RemoteBrowserScraper::new("http://127.0.0.1:9515/", Duration::from_secs(1)).expect("new");
        assert_eq!(remote.base_url(), "http://127.0.0.1:9515");
    }

    #[tokio::test]
    async fn test_probe_and_scrape_against_stub() {
        let router = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/scrape", post(echo_scrape));
        let base = spawn_stub(router).await;

        let remote = RemoteBrowserScraper::new(&base, Duration::from_secs(5)).expect("new");
        remote.probe(Duration::from_secs(2)).await.expect("probe");

        let platforms = vec!["zhihu".to_string(), "linkedin".to_string()];
        let results = remote
            .scrape_all("phd funding", &platforms, 7)
            .await
            .expect("scrape");
        assert_eq!(results.len(), 2);
        assert_eq!(results["zhihu"][0]["keywords"], "phd funding");
        assert_eq!(results["linkedin"][0]["limit"], 7);
    }

    #[tokio::test]
    async fn test_probe_fails_on_unhealthy_status() {
        let router = Router::new().route(
            "/health",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "no browser") }),
        );
        let base = spawn_stub(router).await;

        let remote = RemoteBrowserScraper::new(&base, Duration::from_secs(5)).expect("new");
        let err = remote.probe(Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, LsqError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_scrape_error_status_becomes_scrape_error() {
        let router = Router::new().route(
            "/scrape",
            post(|| async { (StatusCode::BAD_GATEWAY, "xiaohongshu blocked the session") }),
        );
        let base = spawn_stub(router).await;

        let remote = RemoteBrowserScraper::new(&base, Duration::from_secs(5)).expect("new");
        match remote
            .scrape_all("mba", &["xiaohongshu".to_string()], 10)
            .await
            .unwrap_err()
        {
            LsqError::Scrape(msg) => {
                assert!(msg.contains("502"));
                assert!(msg.contains("blocked"));
            }
            other => panic!("Expected Scrape, got: {:?}", other),
        }
    }
}
