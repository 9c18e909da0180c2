use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{sort_by_creation, JobStore};
use crate::models::ScrapeJob;

/// Job store that mirrors every `put` to `jobs.json` so history survives a
/// daemon restart.
pub struct JsonJobStore {
    file_path: PathBuf,
    cache: RwLock<HashMap<Uuid, ScrapeJob>>,
    // Serializes snapshot + write so the file always ends at the newest state.
    write_lock: Mutex<()>,
}

impl JsonJobStore {
    /// Create a new JsonJobStore, loading existing data from disk if present.
    ///
    /// If `jobs.json` is corrupted (invalid JSON), creates a backup at
    /// `jobs.json.bak`, logs a warning, and starts with an empty history.
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .context("Failed to create data directory")?;

        let file_path = data_dir.join("jobs.json");

        let jobs = if file_path.exists() {
            let content = tokio::fs::read_to_string(&file_path)
                .await
                .context("Failed to read jobs.json")?;
            match serde_json::from_str::<Vec<ScrapeJob>>(&content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(
                        "jobs.json is corrupted ({}), creating backup and starting empty",
                        e
                    );
                    let backup_path = data_dir.join("jobs.json.bak");
                    if let Err(backup_err) = tokio::fs::copy(&file_path, &backup_path).await {
                        tracing::error!(
                            "Failed to create backup of corrupted jobs.json: {}",
                            backup_err
                        );
                    }
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        tracing::debug!("Loaded {} job(s) from {}", jobs.len(), file_path.display());

        Ok(Self {
            file_path,
            cache: RwLock::new(jobs.into_iter().map(|j| (j.id, j)).collect()),
            write_lock: Mutex::new(()),
        })
    }

    /// Atomically write the job history to disk.
    /// Writes to a .tmp file first, then renames to the actual file.
    async fn persist(&self, jobs: &[ScrapeJob]) -> Result<()> {
        let tmp_path = self.file_path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(jobs).context("Failed to serialize jobs")?;

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .context("Failed to write temporary jobs file")?;

        tokio::fs::rename(&tmp_path, &self.file_path)
            .await
            .context("Failed to rename temporary jobs file")?;

        Ok(())
    }

    async fn snapshot(&self) -> Vec<ScrapeJob> {
        let mut all: Vec<ScrapeJob> = self.cache.read().await.values().cloned().collect();
        sort_by_creation(&mut all);
        all
    }
}

#[async_trait]
impl JobStore for JsonJobStore {
    async fn put(&self, job: ScrapeJob) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        // Readers see the new record before the disk write starts.
        self.cache.write().await.insert(job.id, job);

        let all = self.snapshot().await;
        self.persist(&all).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScrapeJob>> {
        Ok(self.cache.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<ScrapeJob>> {
        let mut owned: Vec<ScrapeJob> = self
            .cache
            .read()
            .await
            .values()
            .filter(|j| j.owner == owner)
            .cloned()
            .collect();
        sort_by_creation(&mut owned);
        Ok(owned)
    }

    async fn list_all(&self) -> Result<Vec<ScrapeJob>> {
        Ok(self.snapshot().await)
    }
}
