use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::adapters::SourceAdapter;
use crate::models::{JobState, Record};
use crate::scheduling::{CancellationToken, ReadyQueue};
use crate::sink::Sink;

/// A recurring fetch-and-forward cycle bound to one source adapter.
///
/// Each activation fetches once, forwards any records to the sink, sleeps for
/// the job's interval and then puts the job back on the ready queue. A job
/// stopped while queued skips its fetch; one stopped mid-fetch finishes the
/// fetch but never requeues.
pub struct PollJob {
    adapter: Arc<dyn SourceAdapter>,
    sink: Arc<dyn Sink>,
    queue: ReadyQueue,
    interval: Duration,
    stopped: AtomicBool,
    state: Mutex<JobState>,
    activations: AtomicU64,
    failures: AtomicU64,
    records_forwarded: AtomicU64,
    requeues: AtomicU64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobSnapshot {
    pub source: String,
    pub state: JobState,
    pub interval: Duration,
    pub stopped: bool,
    pub activations: u64,
    pub failures: u64,
    pub records_forwarded: u64,
    pub requeues: u64,
}

impl PollJob {
    pub fn new(
        adapter: Arc<dyn SourceAdapter>,
        sink: Arc<dyn Sink>,
        queue: ReadyQueue,
        interval: Duration,
    ) -> Self {
        Self {
            adapter,
            sink,
            queue,
            interval,
            stopped: AtomicBool::new(false),
            state: Mutex::new(JobState::Queued),
            activations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            records_forwarded: AtomicU64::new(0),
            requeues: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &str {
        self.adapter.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Marks the job as non-requeueable. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if *state == JobState::Queued {
            *state = JobState::Stopped;
        }
        tracing::debug!(source = self.source(), "job stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> JobState {
        *self.lock_state()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            source: self.source().to_string(),
            state: self.state(),
            interval: self.interval,
            stopped: self.is_stopped(),
            activations: self.activations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            records_forwarded: self.records_forwarded.load(Ordering::Relaxed),
            requeues: self.requeues.load(Ordering::Relaxed),
        }
    }

    /// Runs one cycle. `interrupt` is the pool-level signal; it cuts a pending
    /// fetch or sleep short and ends the activation without requeueing.
    pub async fn activate(self: Arc<Self>, interrupt: CancellationToken) {
        if self.is_stopped() {
            self.set_state(JobState::Stopped);
            tracing::debug!(source = self.source(), "job stopped while queued, skipping fetch");
            return;
        }
        self.activations.fetch_add(1, Ordering::Relaxed);
        self.set_state(JobState::Running);

        let adapter = Arc::clone(&self.adapter);
        let fetch = tokio::task::spawn_blocking(move || adapter.fetch());
        let outcome = tokio::select! {
            biased;
            () = interrupt.cancelled() => {
                tracing::info!(source = self.source(), "activation interrupted during fetch");
                self.set_state(JobState::Stopped);
                return;
            }
            outcome = fetch => outcome,
        };

        match outcome {
            Ok(Ok(records)) if records.is_empty() => {
                tracing::debug!(source = self.source(), "no new records");
            }
            Ok(Ok(records)) => self.forward(records).await,
            Ok(Err(error)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    source = self.source(),
                    kind = ?error.kind,
                    error = %error.message,
                    "fetch failed"
                );
            }
            Err(join_error) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    source = self.source(),
                    error = %join_error,
                    "fetch aborted unexpectedly"
                );
            }
        }

        if self.is_stopped() {
            self.set_state(JobState::Stopped);
            tracing::debug!(source = self.source(), "job stopped before sleep, not requeueing");
            return;
        }

        self.set_state(JobState::Sleeping);
        tokio::select! {
            biased;
            () = interrupt.cancelled() => {
                tracing::debug!(source = self.source(), "sleep interrupted");
                self.set_state(JobState::Stopped);
                return;
            }
            () = tokio::time::sleep(self.interval) => {}
        }

        self.requeue();
    }

    async fn forward(&self, records: Vec<Record>) {
        let count = records.len();
        let sink = Arc::clone(&self.sink);
        match tokio::task::spawn_blocking(move || sink.append(&records)).await {
            Ok(Ok(())) => {
                self.records_forwarded
                    .fetch_add(count as u64, Ordering::Relaxed);
                tracing::info!(source = self.source(), records = count, "records forwarded");
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    source = self.source(),
                    records = count,
                    kind = ?error.kind,
                    error = %error.message,
                    "sink append failed, dropping batch"
                );
            }
            Err(join_error) => {
                tracing::error!(
                    source = self.source(),
                    records = count,
                    error = %join_error,
                    "sink append aborted unexpectedly, dropping batch"
                );
            }
        }
    }

    fn requeue(self: &Arc<Self>) {
        let mut state = self.lock_state();
        if self.is_stopped() {
            *state = JobState::Stopped;
            tracing::debug!(source = self.source(), "job stopped during sleep, not requeueing");
            return;
        }
        *state = JobState::Queued;
        self.requeues.fetch_add(1, Ordering::Relaxed);
        self.queue.enqueue(Arc::clone(self));
    }

    fn set_state(&self, next: JobState) {
        *self.lock_state() = next;
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
