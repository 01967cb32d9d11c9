use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::scheduling::CancellationToken;
use crate::scheduling::job::PollJob;

/// Unbounded FIFO of jobs waiting for a worker slot.
#[derive(Clone, Default)]
pub struct ReadyQueue {
    inner: Arc<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    jobs: Mutex<VecDeque<Arc<PollJob>>>,
    available: Notify,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, job: Arc<PollJob>) {
        self.jobs().push_back(job);
        self.inner.available.notify_one();
    }

    /// Puts a job back at the head, ahead of everything already waiting.
    pub fn enqueue_front(&self, job: Arc<PollJob>) {
        self.jobs().push_front(job);
        self.inner.available.notify_one();
    }

    pub fn try_dequeue(&self) -> Option<Arc<PollJob>> {
        self.jobs().pop_front()
    }

    /// Waits for the next job. Returns `None` once `token` is cancelled.
    pub async fn dequeue(&self, token: &CancellationToken) -> Option<Arc<PollJob>> {
        loop {
            if token.is_cancelled() {
                return None;
            }
            if let Some(job) = self.try_dequeue() {
                return Some(job);
            }
            tokio::select! {
                biased;
                () = token.cancelled() => return None,
                () = self.inner.available.notified() => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Drops every waiting job and returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut jobs = self.jobs();
        let removed = jobs.len();
        jobs.clear();
        removed
    }

    /// Source names in admission order.
    pub fn queued_sources(&self) -> Vec<String> {
        self.jobs()
            .iter()
            .map(|job| job.source().to_string())
            .collect()
    }

    fn jobs(&self) -> MutexGuard<'_, VecDeque<Arc<PollJob>>> {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
