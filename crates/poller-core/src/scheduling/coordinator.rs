use std::sync::Arc;
use std::time::Duration;

use crate::models::CoreErrorKind;
use crate::scheduling::{CancellationToken, PollJob, ReadyQueue, Slot, WorkerPool};

/// Moves ready jobs into free worker slots until cancelled.
pub struct Coordinator {
    queue: ReadyQueue,
    pool: Arc<WorkerPool>,
    running: CancellationToken,
    tick: Duration,
}

impl Coordinator {
    pub fn new(
        queue: ReadyQueue,
        pool: Arc<WorkerPool>,
        running: CancellationToken,
        tick: Duration,
    ) -> Self {
        Self {
            queue,
            pool,
            running,
            tick,
        }
    }

    pub async fn run(self) {
        let max_concurrency = self.pool.capacity();
        let mut slots: Vec<Slot> = Vec::with_capacity(max_concurrency);
        tracing::info!(max_concurrency, "coordinator started");

        while !self.running.is_cancelled() {
            reap(&mut slots).await;

            while slots.len() < max_concurrency {
                let Some(job) = self.queue.try_dequeue() else {
                    break;
                };
                if !self.admit(job, &mut slots) {
                    break;
                }
            }

            if slots.is_empty() {
                // Nothing in flight: block until a job becomes ready.
                let Some(job) = self.queue.dequeue(&self.running).await else {
                    break;
                };
                if self.admit(job, &mut slots) {
                    continue;
                }
            }

            tokio::select! {
                biased;
                () = self.running.cancelled() => break,
                () = tokio::time::sleep(self.tick) => {}
            }
        }

        tracing::info!(in_flight = slots.len(), "coordinator stopped");
    }

    fn admit(&self, job: Arc<PollJob>, slots: &mut Vec<Slot>) -> bool {
        match self.pool.submit(Arc::clone(&job)) {
            Ok(slot) => {
                tracing::debug!(
                    source = slot.source(),
                    occupied = self.pool.occupied(),
                    "job admitted"
                );
                slots.push(slot);
                true
            }
            Err(error) => {
                self.queue.enqueue_front(job);
                if error.kind == CoreErrorKind::Cancelled {
                    tracing::debug!(error = %error.message, "admission refused");
                } else {
                    tracing::warn!(
                        source = error.source_name.as_deref(),
                        kind = ?error.kind,
                        error = %error.message,
                        "admission refused"
                    );
                }
                false
            }
        }
    }
}

async fn reap(slots: &mut Vec<Slot>) {
    let mut index = 0;
    while index < slots.len() {
        if !slots[index].is_finished() {
            index += 1;
            continue;
        }
        let slot = slots.swap_remove(index);
        let source = slot.source().to_string();
        if let Err(error) = slot.join().await
            && error.is_panic()
        {
            tracing::error!(source, "activation panicked; job will not run again");
        }
    }
}
