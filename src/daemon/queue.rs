use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::errors::LsqError;

/// Unbounded FIFO hand-off of job ids from submitters to workers.
///
/// Each submitted id is handed to exactly one `take` caller. Workers share
/// the single receiver behind a mutex; `recv` is cancel-safe, so a `take`
/// that times out never loses an id.
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Uuid>,
    rx: Mutex<mpsc::UnboundedReceiver<Uuid>>,
    depth: AtomicUsize,
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            depth: AtomicUsize::new(0),
        }
    }

    /// Append a job id. Never blocks.
    pub fn submit(&self, id: Uuid) -> Result<(), LsqError> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.tx.send(id).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            LsqError::Internal("job queue receiver dropped".to_string())
        })
    }

    /// Remove the oldest id, waiting at most `timeout`. `None` means nothing
    /// arrived in time.
    pub async fn take(&self, timeout: Duration) -> Option<Uuid> {
        let taken = tokio::time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await
        .ok()
        .flatten();

        if taken.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        taken
    }

    /// Ids submitted but not yet taken.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
