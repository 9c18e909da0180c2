use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::daemon::queue::JobQueue;
use crate::models::{JobStatus, ScrapeJob};
use crate::scraper::ScraperFacade;
use crate::storage::JobStore;

/// Fixed-size set of workers draining the job queue.
///
/// Each worker loops: wait for an execution slot, `take` from the queue with
/// the poll interval as timeout, run the job to a terminal state, repeat.
/// `stop` is observed at the next timeout; a job already claimed always
/// finishes. Slots are a semaphore with one permit per worker, so a
/// `stop` + `start` pair can never run more than `worker_count` jobs at once
/// while the previous generation winds down.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct PoolInner {
    store: Arc<dyn JobStore>,
    queue: Arc<JobQueue>,
    facade: ScraperFacade,
    worker_count: usize,
    poll_interval: Duration,
    running: AtomicBool,
    generation: AtomicU64,
    slots: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<JobQueue>,
        facade: ScraperFacade,
        worker_count: usize,
        poll_interval: Duration,
    ) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            inner: Arc::new(PoolInner {
                store,
                queue,
                facade,
                worker_count,
                poll_interval,
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                slots: Arc::new(Semaphore::new(worker_count)),
            }),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the workers. No-op when already running.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Worker pool already running");
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut handles = self.lock_handles();
        handles.retain(|h| !h.is_finished());
        for index in 0..self.inner.worker_count {
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(run_worker(inner, generation, index)));
        }

        tracing::info!(
            "Worker pool started ({} workers, backend: {})",
            self.inner.worker_count,
            self.inner.facade.backend_name()
        );
    }

    /// Ask workers to exit after their current poll. In-flight jobs finish.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Worker pool stopping");
        }
    }

    /// Stop and wait for every worker task, including in-flight jobs.
    pub async fn shutdown(&self) {
        self.stop();
        let handles: Vec<JoinHandle<()>> = self.lock_handles().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Worker task ended abnormally: {}", e);
            }
        }
        tracing::info!("Worker pool stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// Worker tasks that have not exited yet.
    pub fn live_workers(&self) -> usize {
        self.lock_handles()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn run_worker(inner: Arc<PoolInner>, generation: u64, index: usize) {
    tracing::debug!("Worker {} started (generation {})", index, generation);

    while inner.is_active(generation) {
        let permit = match tokio::time::timeout(
            inner.poll_interval,
            Arc::clone(&inner.slots).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                tracing::error!("Worker {}: execution slots closed, exiting", index);
                break;
            }
            Err(_) => continue,
        };

        if !inner.is_active(generation) {
            break;
        }

        let Some(id) = inner.queue.take(inner.poll_interval).await else {
            continue;
        };

        // Execution runs in its own task so a panic anywhere in it is caught
        // here and the worker keeps going.
        let outcome = tokio::spawn(Arc::clone(&inner).execute(id)).await;
        if let Err(e) = outcome {
            let message = if e.is_panic() {
                format!("scrape task panicked: {}", panic_message(e.into_panic()))
            } else {
                format!("scrape task aborted: {}", e)
            };
            tracing::error!("Worker {}: job {} crashed: {}", index, id, message);
            inner.fail_crashed(id, message).await;
        }

        drop(permit);
    }

    tracing::debug!("Worker {} exited (generation {})", index, generation);
}

impl PoolInner {
    fn is_active(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    async fn execute(self: Arc<Self>, id: Uuid) {
        let job = match self.store.get(id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::error!("Job {} was queued but is not in the store", id);
                return;
            }
            Err(e) => {
                tracing::error!("Failed to load job {}: {}", id, e);
                return;
            }
        };

        let running = match job.start(Utc::now()) {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!("Skipping job {}: {}", id, e);
                return;
            }
        };
        self.save(&running).await;
        tracing::info!(
            "Job {} started: '{}' on [{}] for {}",
            id,
            running.keywords,
            running.platforms.join(", "),
            running.owner
        );

        let finished = match self
            .facade
            .scrape(&running.keywords, &running.platforms)
            .await
            .and_then(|results| running.complete(results, Utc::now()))
        {
            Ok(completed) => {
                tracing::info!(
                    "Job {} completed ({} platform(s))",
                    id,
                    completed.result.len()
                );
                completed
            }
            Err(e) => match running.fail(e.to_string(), Utc::now()) {
                Ok(failed) => {
                    tracing::warn!("Job {} failed: {}", id, e);
                    failed
                }
                Err(transition) => {
                    tracing::error!("Job {} could not be marked failed: {}", id, transition);
                    return;
                }
            },
        };

        self.save(&finished).await;
    }

    async fn fail_crashed(&self, id: Uuid, message: String) {
        let current = match self.store.get(id).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Failed to load crashed job {}: {}", id, e);
                return;
            }
        };

        let now = Utc::now();
        let failed = match current.status {
            JobStatus::Running => current.fail(message, now),
            JobStatus::Pending => current.start(now).and_then(|r| r.fail(message, now)),
            JobStatus::Completed | JobStatus::Failed => return,
        };

        match failed {
            Ok(job) => self.save(&job).await,
            Err(e) => tracing::error!("Failed to record crash of job {}: {}", id, e),
        }
    }

    async fn save(&self, job: &ScrapeJob) {
        if let Err(e) = self.store.put(job.clone()).await {
            tracing::error!("Failed to store job {} ({}): {}", job.id, job.status, e);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewScrapeJob;
    use crate::scraper::{MockScraper, ScrapeBackend};
    use crate::storage::InMemoryJobStore;

    struct Harness {
        pool: WorkerPool,
        store: Arc<InMemoryJobStore>,
        queue: Arc<JobQueue>,
        mock: Arc<MockScraper>,
    }

    fn harness(mock: MockScraper, workers: usize) -> Harness {
        let store = Arc::new(InMemoryJobStore::new());
        let queue = Arc::new(JobQueue::new());
        let mock = Arc::new(mock);
        let facade = ScraperFacade::new(Arc::clone(&mock) as Arc<dyn ScrapeBackend>, 10);
        let pool = WorkerPool::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::clone(&queue),
            facade,
            workers,
            Duration::from_millis(20),
        );
        Harness {
            pool,
            store,
            queue,
            mock,
        }
    }

    async fn enqueue(h: &Harness, owner: &str) -> Uuid {
        let job = ScrapeJob::new(NewScrapeJob {
            keywords: "study abroad".to_string(),
            platforms: vec!["a".to_string(), "b".to_string()],
            owner: owner.to_string(),
        })
        .expect("new job");
        let id = job.id;
        h.store.put(job).await.expect("put");
        h.queue.submit(id).expect("submit");
        id
    }

    async fn wait_terminal(store: &InMemoryJobStore, id: Uuid) -> ScrapeJob {
        for _ in 0..300 {
            if let Some(job) = store.get(id).await.expect("get") {
                if job.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not reach a terminal state", id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_successful_job_completes() {
        let h = harness(MockScraper::succeeding(), 2);
        h.pool.start();
        let id = enqueue(&h, "u1").await;

        let job = wait_terminal(&h.store, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result.len(), 2);
        assert!(job.error.is_none());
        assert!(job.started_at.expect("started") <= job.completed_at.expect("completed"));

        h.pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failing_backend_marks_job_failed() {
        let h = harness(MockScraper::failing("login required"), 1);
        h.pool.start();
        let id = enqueue(&h, "u1").await;

        let job = wait_terminal(&h.store, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_empty());
        assert!(job.error.expect("error").contains("login required"));
        assert!(job.completed_at.is_some());

        h.pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panicking_backend_fails_job_and_worker_survives() {
        let h = harness(MockScraper::panicking("selenium exploded"), 1);
        h.pool.start();
        let first = enqueue(&h, "u1").await;
        let second = enqueue(&h, "u1").await;

        let job = wait_terminal(&h.store, first).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.expect("error").contains("selenium exploded"));

        // The single worker must still be alive to pick up the next job.
        let job = wait_terminal(&h.store, second).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(h.pool.live_workers(), 1);

        h.pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_start_is_idempotent() {
        let h = harness(MockScraper::succeeding(), 2);
        h.pool.start();
        h.pool.start();
        assert!(h.pool.is_running());
        assert_eq!(h.pool.live_workers(), 2);
        h.pool.shutdown().await;
        assert_eq!(h.pool.live_workers(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounded_by_worker_count() {
        let h = harness(MockScraper::with_delay(100), 2);
        h.pool.start();
        let mut ids = Vec::new();
        for _ in 0..6 {
            ids.push(enqueue(&h, "u1").await);
        }
        for id in ids {
            assert_eq!(wait_terminal(&h.store, id).await.status, JobStatus::Completed);
        }
        assert_eq!(h.mock.max_in_flight(), 2);
        h.pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stopped_pool_leaves_jobs_pending_until_restart() {
        let h = harness(MockScraper::succeeding(), 1);
        h.pool.start();
        h.pool.shutdown().await;

        let id = enqueue(&h, "u1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let job = h.store.get(id).await.expect("get").expect("found");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());

        h.pool.start();
        assert_eq!(wait_terminal(&h.store, id).await.status, JobStatus::Completed);
        h.pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_restart_does_not_exceed_worker_count() {
        let h = harness(MockScraper::with_delay(150), 1);
        h.pool.start();
        let first = enqueue(&h, "u1").await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Old worker is still busy with `first` when the new generation starts.
        h.pool.stop();
        h.pool.start();
        let second = enqueue(&h, "u1").await;

        assert_eq!(wait_terminal(&h.store, first).await.status, JobStatus::Completed);
        assert_eq!(wait_terminal(&h.store, second).await.status, JobStatus::Completed);
        assert_eq!(h.mock.max_in_flight(), 1);
        h.pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_already_started_job_is_not_run_again() {
        let h = harness(MockScraper::succeeding(), 1);
        let id = enqueue(&h, "u1").await;
        let job = h.store.get(id).await.expect("get").expect("found");
        h.store
            .put(job.start(Utc::now()).expect("start"))
            .await
            .expect("put");

        h.pool.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.mock.calls(), 0);
        h.pool.shutdown().await;
    }
}
