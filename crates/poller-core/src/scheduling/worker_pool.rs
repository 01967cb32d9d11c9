use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};

use crate::models::{CoreError, CoreErrorKind};
use crate::scheduling::{CancellationToken, PollJob, SchedulerResult};

/// Fixed number of execution slots. A slot stays occupied for a job's whole
/// activation, including its sleep.
pub struct WorkerPool {
    capacity: usize,
    inner: Arc<PoolInner>,
    interrupt: CancellationToken,
}

#[derive(Default)]
struct PoolInner {
    occupied: AtomicUsize,
    peak: AtomicUsize,
    closed: AtomicBool,
    idle: Notify,
}

/// Handle to one in-progress activation.
pub struct Slot {
    source: String,
    handle: JoinHandle<()>,
}

impl Slot {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<(), JoinError> {
        self.handle.await
    }
}

struct OccupancyGuard {
    inner: Arc<PoolInner>,
}

impl Drop for OccupancyGuard {
    fn drop(&mut self) {
        if self.inner.occupied.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl WorkerPool {
    pub fn new(capacity: usize) -> SchedulerResult<Self> {
        if capacity == 0 {
            return Err(CoreError::configuration(
                "worker pool needs at least one slot",
            ));
        }
        Ok(Self {
            capacity,
            inner: Arc::new(PoolInner::default()),
            interrupt: CancellationToken::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupies a slot and starts `job.activate()` on the runtime.
    pub fn submit(&self, job: Arc<PollJob>) -> SchedulerResult<Slot> {
        if self.is_shut_down() {
            return Err(CoreError::new(
                CoreErrorKind::Cancelled,
                "worker pool is shut down",
            )
            .attributed_to(job.source()));
        }

        let mut current = self.inner.occupied.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return Err(CoreError::new(
                    CoreErrorKind::Internal,
                    format!("all {} worker slots are occupied", self.capacity),
                )
                .attributed_to(job.source()));
            }
            match self.inner.occupied.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.inner.peak.fetch_max(current + 1, Ordering::AcqRel);

        let guard = OccupancyGuard {
            inner: Arc::clone(&self.inner),
        };
        let interrupt = self.interrupt.clone();
        let source = job.source().to_string();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            job.activate(interrupt).await;
        });

        Ok(Slot { source, handle })
    }

    pub fn occupied(&self) -> usize {
        self.inner.occupied.load(Ordering::Acquire)
    }

    /// Highest occupancy observed since the pool was created.
    pub fn peak_occupancy(&self) -> usize {
        self.inner.peak.load(Ordering::Acquire)
    }

    /// Refuses further submissions and interrupts every running activation at
    /// its next suspension point.
    pub fn shutdown_now(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(occupied = self.occupied(), "interrupting worker slots");
        }
        self.interrupt.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Waits until no slot is occupied. Returns false if `timeout` elapses first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let idle = async {
            loop {
                let notified = self.inner.idle.notified();
                if self.occupied() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, idle).await.is_ok()
    }
}
