use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::LsqError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_scrape_limit")]
    pub scrape_limit: usize,
    #[serde(default)]
    pub live_scraper_url: Option<String>,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub persist_jobs: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8466
}

fn default_worker_count() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_scrape_limit() -> usize {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    600
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: None,
            worker_count: default_worker_count(),
            poll_interval_ms: default_poll_interval_ms(),
            scrape_limit: default_scrape_limit(),
            live_scraper_url: None,
            probe_timeout_secs: default_probe_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            persist_jobs: false,
        }
    }
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), LsqError> {
        if self.worker_count == 0 {
            return Err(LsqError::Validation(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(LsqError::Validation(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.persist_jobs && self.data_dir.is_none() {
            return Err(LsqError::Validation(
                "persist_jobs requires a data_dir".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_config_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8466);
        assert!(config.data_dir.is_none());
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.scrape_limit, 10);
        assert!(config.live_scraper_url.is_none());
        assert_eq!(config.probe_timeout_secs, 5);
        assert_eq!(config.request_timeout_secs, 600);
        assert!(!config.persist_jobs);
    }

    #[test]
    fn test_daemon_config_partial_deserialization_empty() {
        let config: DaemonConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config.port, 8466);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_daemon_config_partial_deserialization_some_fields() {
        let json = r#"{"worker_count": 4, "live_scraper_url": "http://127.0.0.1:9515"}"#;
        let config: DaemonConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.worker_count, 4);
        assert_eq!(
            config.live_scraper_url.as_deref(),
            Some("http://127.0.0.1:9515")
        );
        assert_eq!(config.scrape_limit, 10); // default
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = DaemonConfig {
            worker_count: 0,
            ..Default::default()
        };
        match config.validate().unwrap_err() {
            LsqError::Validation(msg) => assert!(msg.contains("worker_count")),
            other => panic!("Expected Validation, got: {:?}", other),
        }
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = DaemonConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_persist_without_data_dir_rejected() {
        let config = DaemonConfig {
            persist_jobs: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DaemonConfig {
            persist_jobs: true,
            data_dir: Some(PathBuf::from("/var/lib/lsq")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
