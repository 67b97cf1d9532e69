//! Bounded worker pool for transfer loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::session::UploadSession;

/// Runs at most `size` sessions at once; further submissions queue in FIFO
/// order until a permit frees up. A paused session keeps its permit.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
    tracker: TaskTracker,
    closed: AtomicBool,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            tracker: TaskTracker::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running session.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of submitted sessions that have not returned yet.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Queues `session` for execution. Returns `false` if it is already
    /// queued or running, or the pool is shut down.
    pub fn submit(&self, session: Arc<UploadSession>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            debug!(upload_id = %session.id(), "pool is shut down, submission ignored");
            return false;
        }
        if !session.mark_scheduled() {
            return false;
        }

        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    debug!(upload_id = %session.id(), "pool closed before session started");
                    session.clear_scheduled();
                    return;
                }
            };
            session.run().await;
        });
        true
    }

    /// Stops accepting work and waits for every submitted session to return.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.tracker.close();
        self.tracker.wait().await;
        self.permits.close();
    }
}
