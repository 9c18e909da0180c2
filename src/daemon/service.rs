use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::daemon::pool::WorkerPool;
use crate::daemon::queue::JobQueue;
use crate::errors::LsqError;
use crate::models::{DaemonConfig, JobStatus, NewScrapeJob, ScrapeJob};
use crate::scraper::ScraperFacade;
use crate::storage::JobStore;

/// Error recorded on jobs that were mid-scrape when the previous process died.
pub const INTERRUPTED_ERROR: &str = "interrupted by daemon restart";

/// Outcome of reconciling a persisted store at start-up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Recovery {
    pub requeued: usize,
    pub interrupted: usize,
}

/// The job store, queue and worker pool of one process, wired together.
///
/// Built once during start-up and shared by handle with everything that
/// submits jobs or answers status queries.
pub struct ScrapeService {
    store: Arc<dyn JobStore>,
    queue: Arc<JobQueue>,
    pool: WorkerPool,
    facade: ScraperFacade,
}

impl ScrapeService {
    /// Wire the components together. The pool is not started.
    pub fn new(
        store: Arc<dyn JobStore>,
        facade: ScraperFacade,
        worker_count: usize,
        poll_interval: Duration,
    ) -> Self {
        let queue = Arc::new(JobQueue::new());
        let pool = WorkerPool::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            facade.clone(),
            worker_count,
            poll_interval,
        );
        Self {
            store,
            queue,
            pool,
            facade,
        }
    }

    /// Detect the scraper backend, reconcile whatever `store` already holds
    /// and start the pool.
    pub async fn launch(config: &DaemonConfig, store: Arc<dyn JobStore>) -> Result<Self> {
        let facade = ScraperFacade::detect(config).await;
        let service = Self::new(store, facade, config.worker_count, config.poll_interval());

        let recovery = service.recover().await?;
        if recovery != Recovery::default() {
            tracing::info!(
                "Recovered job history: {} re-queued, {} marked interrupted",
                recovery.requeued,
                recovery.interrupted
            );
        }

        service.start();
        Ok(service)
    }

    /// Validate, record as pending and enqueue. Returns before execution
    /// starts; the returned snapshot carries the new job id.
    pub async fn submit(&self, request: NewScrapeJob) -> Result<ScrapeJob, LsqError> {
        let job = ScrapeJob::new(request)?;

        // Visible in the store before any worker can claim it.
        if let Err(e) = self.store.put(job.clone()).await {
            // A persisting store may have accepted the record in memory and
            // only failed on disk. Such a job must still be queued.
            match self.store.get(job.id).await {
                Ok(Some(_)) => {
                    tracing::error!("Job {} recorded but not persisted: {:#}", job.id, e);
                }
                _ => return Err(storage_error(e)),
            }
        }
        self.queue.submit(job.id)?;

        tracing::info!(
            "Job {} submitted by {}: '{}' on [{}]",
            job.id,
            job.owner,
            job.keywords,
            job.platforms.join(", ")
        );
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ScrapeJob>, LsqError> {
        self.store.get(id).await.map_err(storage_error)
    }

    pub async fn list_by_owner(&self, owner: &str) -> Result<Vec<ScrapeJob>, LsqError> {
        self.store.list_by_owner(owner).await.map_err(storage_error)
    }

    pub fn start(&self) {
        self.pool.start();
    }

    pub fn stop(&self) {
        self.pool.stop();
    }

    /// Stop the pool and wait for in-flight jobs to finish.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    /// Bring jobs left behind by a previous process back into a consistent
    /// state. Pending jobs are re-queued oldest first; running jobs are
    /// failed because their scrape was cut off.
    pub async fn recover(&self) -> Result<Recovery> {
        let mut recovery = Recovery::default();

        for job in self.store.list_all().await? {
            match job.status {
                JobStatus::Pending => {
                    self.queue.submit(job.id)?;
                    recovery.requeued += 1;
                }
                JobStatus::Running => {
                    let failed = job.fail(INTERRUPTED_ERROR, Utc::now())?;
                    tracing::warn!("Job {} was running at last shutdown, marking failed", job.id);
                    self.store.put(failed).await?;
                    recovery.interrupted += 1;
                }
                JobStatus::Completed | JobStatus::Failed => {}
            }
        }

        Ok(recovery)
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    pub fn backend_name(&self) -> &str {
        self.facade.backend_name()
    }

    /// Jobs submitted but not yet claimed by a worker.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

fn storage_error(err: anyhow::Error) -> LsqError {
    LsqError::Storage(format!("{:#}", err))
}
