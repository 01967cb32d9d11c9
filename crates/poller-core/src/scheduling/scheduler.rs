use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::adapters::SourceResolver;
use crate::models::{CoreError, CoreErrorKind};
use crate::scheduling::{
    CancellationToken, Coordinator, JobSnapshot, PollJob, ReadyQueue, SchedulerResult, WorkerPool,
};
use crate::sink::Sink;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchedulerSettings {
    pub max_concurrency: usize,
    /// How often the coordinator looks for freed slots while jobs are in flight.
    pub coordinator_tick: Duration,
    /// Upper bound on waiting for in-flight activations during shutdown.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            coordinator_tick: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl SchedulerSettings {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.max_concurrency == 0 {
            return Err(CoreError::configuration(
                "max concurrency must be a positive integer",
            ));
        }
        if self.coordinator_tick.is_zero() {
            return Err(CoreError::configuration(
                "coordinator tick must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// A configured source name and the pause between its activations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduledSource {
    pub name: String,
    pub interval: Duration,
}

impl ScheduledSource {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SchedulerLifecycle {
    Created,
    Running,
    /// Started with no runnable jobs; the coordinator never runs.
    Idle,
    ShuttingDown,
    Terminated,
}

impl SchedulerLifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Idle => "idle",
            Self::ShuttingDown => "shutting_down",
            Self::Terminated => "terminated",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub lifecycle: SchedulerLifecycle,
    pub max_concurrency: usize,
    pub occupied: usize,
    pub peak_occupancy: usize,
    pub ready: Vec<String>,
    pub jobs: Vec<JobSnapshot>,
    pub uptime: Option<Duration>,
}

/// Owns the ready queue, worker pool and coordinator for a fixed set of
/// sources and drives them through start and shutdown.
pub struct PollScheduler {
    settings: SchedulerSettings,
    sources: Vec<ScheduledSource>,
    resolver: Arc<dyn SourceResolver>,
    sink: Arc<dyn Sink>,
    queue: ReadyQueue,
    pool: Arc<WorkerPool>,
    running: CancellationToken,
    jobs: Mutex<Vec<Arc<PollJob>>>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
    lifecycle: Mutex<SchedulerLifecycle>,
    started_at: Mutex<Option<Instant>>,
    sink_closed: AtomicBool,
    terminated: watch::Sender<bool>,
}

impl PollScheduler {
    pub fn new(
        settings: SchedulerSettings,
        sources: Vec<ScheduledSource>,
        resolver: Arc<dyn SourceResolver>,
        sink: Arc<dyn Sink>,
    ) -> SchedulerResult<Self> {
        settings.validate()?;
        if let Some(source) = sources.iter().find(|source| source.interval.is_zero()) {
            return Err(CoreError::configuration(format!(
                "poll interval for source '{}' must be greater than zero",
                source.name
            )));
        }

        let pool = Arc::new(WorkerPool::new(settings.max_concurrency)?);
        let (terminated, _) = watch::channel(false);
        Ok(Self {
            settings,
            sources,
            resolver,
            sink,
            queue: ReadyQueue::new(),
            pool,
            running: CancellationToken::new(),
            jobs: Mutex::new(Vec::new()),
            coordinator: Mutex::new(None),
            lifecycle: Mutex::new(SchedulerLifecycle::Created),
            started_at: Mutex::new(None),
            sink_closed: AtomicBool::new(false),
            terminated,
        })
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn lifecycle(&self) -> SchedulerLifecycle {
        *lock(&self.lifecycle)
    }

    /// Builds one job per resolvable source, seeds the ready queue in
    /// configuration order and spawns the coordinator. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> SchedulerResult<()> {
        let mut lifecycle = lock(&self.lifecycle);
        if *lifecycle != SchedulerLifecycle::Created {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("scheduler cannot start from state '{}'", lifecycle.as_str()),
            ));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CoreError::new(
                CoreErrorKind::Internal,
                format!("scheduler must be started inside a tokio runtime: {e}"),
            )
        })?;

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let Some(adapter) = self.resolver.resolve(&source.name) else {
                tracing::warn!(source = %source.name, "unknown source, skipping");
                continue;
            };
            if !seen.insert(adapter.name().to_string()) {
                tracing::warn!(
                    source = %source.name,
                    "source configured more than once, skipping duplicate"
                );
                continue;
            }

            let job = Arc::new(PollJob::new(
                adapter,
                Arc::clone(&self.sink),
                self.queue.clone(),
                source.interval,
            ));
            tracing::info!(
                source = job.source(),
                interval_secs = source.interval.as_secs_f64(),
                "scheduled source"
            );
            self.queue.enqueue(Arc::clone(&job));
            jobs.push(job);
        }

        *lock(&self.started_at) = Some(Instant::now());

        if jobs.is_empty() {
            tracing::warn!("no valid sources configured, scheduler is idle");
            *lifecycle = SchedulerLifecycle::Idle;
            return Ok(());
        }

        let job_count = jobs.len();
        *lock(&self.jobs) = jobs;

        let coordinator = Coordinator::new(
            self.queue.clone(),
            Arc::clone(&self.pool),
            self.running.clone(),
            self.settings.coordinator_tick,
        );
        *lock(&self.coordinator) = Some(runtime.spawn(coordinator.run()));
        *lifecycle = SchedulerLifecycle::Running;

        tracing::info!(
            jobs = job_count,
            max_concurrency = self.settings.max_concurrency,
            "scheduler started"
        );
        Ok(())
    }

    /// Stops all jobs, interrupts in-flight activations, waits up to the
    /// shutdown grace for them to drain and closes the sink once. Calling it
    /// again, or before `start`, is a no-op apart from the state change.
    pub async fn shutdown(&self) {
        {
            let mut lifecycle = lock(&self.lifecycle);
            let current = *lifecycle;
            match current {
                SchedulerLifecycle::Created => {
                    *lifecycle = SchedulerLifecycle::Terminated;
                    drop(lifecycle);
                    self.terminated.send_replace(true);
                    tracing::info!("scheduler shut down before start");
                    return;
                }
                SchedulerLifecycle::ShuttingDown | SchedulerLifecycle::Terminated => {
                    tracing::debug!("shutdown already requested");
                    return;
                }
                SchedulerLifecycle::Running | SchedulerLifecycle::Idle => {
                    *lifecycle = SchedulerLifecycle::ShuttingDown;
                }
            }
        }

        tracing::info!("shutting down scheduler");
        self.running.cancel();

        let jobs = lock(&self.jobs).clone();
        for job in &jobs {
            job.stop();
        }
        let dropped = self.queue.clear();
        self.pool.shutdown_now();
        tracing::debug!(
            jobs = jobs.len(),
            dropped_from_queue = dropped,
            "stop broadcast and interrupt issued"
        );

        if !self.pool.wait_idle(self.settings.shutdown_grace).await {
            tracing::warn!(
                in_flight = self.pool.occupied(),
                grace_secs = self.settings.shutdown_grace.as_secs_f64(),
                "in-flight activations did not finish within the shutdown grace"
            );
        }

        let coordinator = lock(&self.coordinator).take();
        if let Some(handle) = coordinator {
            let abort = handle.abort_handle();
            match tokio::time::timeout(self.settings.shutdown_grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(error = %error, "coordinator ended abnormally");
                }
                Err(_) => {
                    tracing::warn!("coordinator did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        self.close_sink();

        *lock(&self.lifecycle) = SchedulerLifecycle::Terminated;
        self.terminated.send_replace(true);
        tracing::info!("scheduler terminated");
    }

    /// Waits up to `timeout` for shutdown to complete.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        let mut terminated = self.terminated.subscribe();
        matches!(
            tokio::time::timeout(timeout, terminated.wait_for(|done| *done)).await,
            Ok(Ok(_))
        )
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            lifecycle: self.lifecycle(),
            max_concurrency: self.settings.max_concurrency,
            occupied: self.pool.occupied(),
            peak_occupancy: self.pool.peak_occupancy(),
            ready: self.queue.queued_sources(),
            jobs: lock(&self.jobs).iter().map(|job| job.snapshot()).collect(),
            uptime: lock(&self.started_at).map(|started| started.elapsed()),
        }
    }

    fn close_sink(&self) {
        if self.sink_closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.sink.close() {
            Ok(()) => tracing::debug!("sink closed"),
            Err(error) => tracing::error!(
                kind = ?error.kind,
                error = %error.message,
                "failed to close sink"
            ),
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.running.cancel();
        for job in lock(&self.jobs).iter() {
            job.stop();
        }
        self.queue.clear();
        self.pool.shutdown_now();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
