pub mod jobs;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::ScrapeJob;

pub use jobs::JsonJobStore;
pub use memory::InMemoryJobStore;

/// Authoritative map from job id to the latest job record.
///
/// `put` replaces the whole record; readers always get an owned snapshot,
/// never a view that can change under them.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, job: ScrapeJob) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<ScrapeJob>>;
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<ScrapeJob>>;
    async fn list_all(&self) -> Result<Vec<ScrapeJob>>;
}

/// Oldest first; v7 ids break ties between jobs created in the same instant.
pub(crate) fn sort_by_creation(jobs: &mut [ScrapeJob]) {
    jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
