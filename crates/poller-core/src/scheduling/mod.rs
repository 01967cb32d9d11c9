mod cancellation;
mod coordinator;
mod job;
mod ready_queue;
mod scheduler;
mod worker_pool;

use crate::models::CoreError;

pub use cancellation::CancellationToken;
pub use coordinator::Coordinator;
pub use job::{JobSnapshot, PollJob};
pub use ready_queue::ReadyQueue;
pub use scheduler::{
    PollScheduler, ScheduledSource, SchedulerLifecycle, SchedulerSettings, SchedulerSnapshot,
};
pub use worker_pool::{Slot, WorkerPool};

pub type SchedulerResult<T> = Result<T, CoreError>;
