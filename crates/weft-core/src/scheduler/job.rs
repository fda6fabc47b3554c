//! Job execution primitives: the safeExec envelope, cancellation flags, and
//! the per-kind runner loops.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

/// Result of one job execution.
pub type JobResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Owned future produced by a job.
pub type JobFuture = Pin<Box<dyn Future<Output = JobResult> + Send + 'static>>;

/// A job body, invoked on every tick.
pub type JobExec = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Computes the next execution instant for a sliding timer.
pub type NextRun = Arc<dyn Fn() -> Option<DateTime<Utc>> + Send + Sync>;

/// Wrap an async closure as a [`JobExec`].
pub fn job_exec<F, Fut>(f: F) -> JobExec
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Cooperative cancellation flag shared between a handle and its task.
///
/// Cancelling wakes the task out of its timer wait; an execution already in
/// flight runs to completion.
pub(crate) struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Returns true on the first call only.
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Run one job execution inside the error-swallowing envelope: failures are
/// logged with the owning context and never reach the scheduler runtime.
pub async fn safe_exec(context: &str, exec: &JobExec) {
    let started = Instant::now();
    match exec().await {
        Ok(()) => {
            log::trace!(target: context, "scheduled job finished in {:?}", started.elapsed());
        }
        Err(e) => {
            log::error!(
                target: context,
                "scheduled job failed after {:?}: {}",
                started.elapsed(),
                e
            );
        }
    }
}

/// Delay until a sliding target, or `None` when the target is absent or
/// already in the past (the tick is skipped).
pub(crate) fn sliding_delay(
    now: DateTime<Utc>,
    target: Option<DateTime<Utc>>,
) -> Option<Duration> {
    let target = target?;
    if target <= now {
        return None;
    }
    (target - now).to_std().ok()
}

/// Delay until the next cron occurrence, or `None` when the schedule is
/// exhausted.
pub(crate) fn cron_delay(schedule: &cron::Schedule, now: DateTime<Utc>) -> Option<Duration> {
    let next = schedule.after(&now).next()?;
    Some((next - now).to_std().unwrap_or(Duration::ZERO))
}

/// Loop for a cron entry: sleep to the next occurrence, run, repeat.
pub(crate) async fn run_cron(
    context: String,
    schedule: cron::Schedule,
    exec: JobExec,
    cancel: Arc<CancelFlag>,
) {
    loop {
        let Some(delay) = cron_delay(&schedule, Utc::now()) else {
            log::debug!(target: context.as_str(), "cron schedule exhausted, stopping");
            break;
        };
        tokio::select! {
            _ = cancel.wait() => break,
            _ = tokio::time::sleep(delay) => {
                if cancel.is_cancelled() {
                    break;
                }
                safe_exec(&context, &exec).await;
            }
        }
    }
}

/// Loop for a fixed-period interval entry.
pub(crate) async fn run_interval(
    context: String,
    period: Duration,
    exec: JobExec,
    cancel: Arc<CancelFlag>,
) {
    loop {
        tokio::select! {
            _ = cancel.wait() => break,
            _ = tokio::time::sleep(period) => {
                if cancel.is_cancelled() {
                    break;
                }
                safe_exec(&context, &exec).await;
            }
        }
    }
}

/// Loop for a sliding entry: every reset tick recomputes the next execution
/// instant and schedules a one-shot for it. Past instants are skipped; a
/// one-shot still pending at the next reset is cancelled with a warning.
pub(crate) async fn run_sliding(
    context: String,
    reset: cron::Schedule,
    next_run: NextRun,
    exec: JobExec,
    cancel: Arc<CancelFlag>,
) {
    let mut pending: Option<(tokio::task::JoinHandle<()>, Arc<CancelFlag>)> = None;
    loop {
        let Some(delay) = cron_delay(&reset, Utc::now()) else {
            log::debug!(target: context.as_str(), "sliding reset schedule exhausted, stopping");
            break;
        };
        tokio::select! {
            _ = cancel.wait() => break,
            _ = tokio::time::sleep(delay) => {
                if cancel.is_cancelled() {
                    break;
                }
                if let Some((task, oneshot_cancel)) = pending.take() {
                    if !task.is_finished() {
                        log::warn!(
                            target: context.as_str(),
                            "previous sliding execution still pending at reset, cancelling it"
                        );
                        oneshot_cancel.cancel();
                    }
                }
                match sliding_delay(Utc::now(), next_run()) {
                    None => {
                        log::debug!(target: context.as_str(), "sliding target absent or in the past, skipping");
                    }
                    Some(delay) => {
                        let oneshot_cancel = Arc::new(CancelFlag::new());
                        let task_cancel = oneshot_cancel.clone();
                        let task_exec = exec.clone();
                        let task_context = context.clone();
                        let task = tokio::spawn(async move {
                            tokio::select! {
                                _ = task_cancel.wait() => {}
                                _ = tokio::time::sleep(delay) => {
                                    if !task_cancel.is_cancelled() {
                                        safe_exec(&task_context, &task_exec).await;
                                    }
                                }
                            }
                        });
                        pending = Some((task, oneshot_cancel));
                    }
                }
            }
        }
    }
    if let Some((_, oneshot_cancel)) = pending {
        oneshot_cancel.cancel();
    }
}
