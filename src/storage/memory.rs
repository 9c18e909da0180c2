use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{sort_by_creation, JobStore};
use crate::models::ScrapeJob;

/// Process-local job store. Entries are never evicted.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, ScrapeJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: ScrapeJob) -> Result<()> {
        self.jobs.write().await.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScrapeJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<ScrapeJob>> {
        let mut owned: Vec<ScrapeJob> = self
            .jobs
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
        let mut all: Vec<ScrapeJob> = self.jobs.read().await.values().cloned().collect();
        sort_by_creation(&mut all);
        Ok(all)
    }
}
