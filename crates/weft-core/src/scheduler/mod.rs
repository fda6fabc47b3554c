//! Lifecycle-gated scheduling: cron, interval and sliding timers.
//!
//! Every service receives constructors bound to its context through the
//! parameter bundle. Activation is tied to the lifecycle: nothing fires
//! before `Ready`, and the `PreShutdown` drain stops every entry.

pub mod error;
pub mod job;
pub mod manager;

pub use error::SchedulerError;
pub use job::{job_exec, safe_exec, JobExec, JobFuture, JobResult};
pub use manager::{SchedulerHandle, SchedulerManager, ServiceScheduler};

#[cfg(test)]
mod tests;
