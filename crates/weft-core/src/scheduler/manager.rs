//! Kernel-owned scheduler.
//!
//! Jobs registered before the application reaches `Ready` are held pending
//! and started in one batch when the lifecycle arrives there; jobs
//! registered afterwards start immediately. Every handle lives in the
//! manager's job table, and the `PreShutdown` drain cancels them all.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::scheduler::error::SchedulerError;
use crate::scheduler::job::{
    job_exec, run_cron, run_interval, run_sliding, CancelFlag, JobExec, JobResult, NextRun,
};

#[derive(Clone)]
enum JobSpec {
    Cron { schedule: cron::Schedule },
    Interval { period: Duration },
    Sliding { reset: cron::Schedule, next: NextRun },
}

struct Job {
    context: String,
    spec: JobSpec,
    exec: JobExec,
    cancel: Arc<CancelFlag>,
    task: Option<tokio::task::JoinHandle<()>>,
}

struct SchedulerInner {
    started: AtomicBool,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<u64, Job>>,
}

/// The scheduler facility. Cheap to clone; clones share the job table.
#[derive(Clone)]
pub struct SchedulerManager {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for SchedulerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let jobs = self.inner.jobs.lock().expect("scheduler lock poisoned");
        f.debug_struct("SchedulerManager")
            .field("started", &self.inner.started.load(Ordering::SeqCst))
            .field("jobs", &jobs.len())
            .finish()
    }
}

impl SchedulerManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                started: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// A scheduler view bound to a service context, handed out through the
    /// service parameter bundle.
    pub fn for_context(&self, context: impl Into<String>) -> ServiceScheduler {
        ServiceScheduler {
            context: context.into(),
            manager: self.clone(),
        }
    }

    /// Number of live (registered, not cancelled) jobs.
    pub fn job_count(&self) -> usize {
        self.inner.jobs.lock().expect("scheduler lock poisoned").len()
    }

    /// Start every pending job. Called when the lifecycle reaches `Ready`.
    pub fn start(&self) {
        self.inner.started.store(true, Ordering::SeqCst);
        let mut jobs = self.inner.jobs.lock().expect("scheduler lock poisoned");
        for job in jobs.values_mut() {
            if job.task.is_none() {
                job.task = Some(spawn_job(job));
            }
        }
    }

    /// Cancel every job and forget the table. Called at `PreShutdown`.
    /// In-flight executions run to completion; nothing new fires.
    pub fn stop(&self) {
        self.inner.started.store(false, Ordering::SeqCst);
        let mut jobs = self.inner.jobs.lock().expect("scheduler lock poisoned");
        for (_, job) in jobs.drain() {
            job.cancel.cancel();
        }
    }

    fn register(&self, context: &str, spec: JobSpec, exec: JobExec) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let mut job = Job {
            context: context.to_string(),
            spec,
            exec,
            cancel: Arc::new(CancelFlag::new()),
            task: None,
        };
        if self.inner.started.load(Ordering::SeqCst) {
            job.task = Some(spawn_job(&job));
        }
        self.inner
            .jobs
            .lock()
            .expect("scheduler lock poisoned")
            .insert(id, job);
        id
    }

    fn cancel_ids(&self, ids: &[u64]) {
        let mut jobs = self.inner.jobs.lock().expect("scheduler lock poisoned");
        for id in ids {
            if let Some(job) = jobs.remove(id) {
                job.cancel.cancel();
            }
        }
    }
}

impl Default for SchedulerManager {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_job(job: &Job) -> tokio::task::JoinHandle<()> {
    let context = job.context.clone();
    let exec = job.exec.clone();
    let cancel = job.cancel.clone();
    match job.spec.clone() {
        JobSpec::Cron { schedule } => tokio::spawn(run_cron(context, schedule, exec, cancel)),
        JobSpec::Interval { period } => tokio::spawn(run_interval(context, period, exec, cancel)),
        JobSpec::Sliding { reset, next } => {
            tokio::spawn(run_sliding(context, reset, next, exec, cancel))
        }
    }
}

/// Cancellation token for one registration. Cancelling is idempotent and
/// never interrupts an execution already in flight.
pub struct SchedulerHandle {
    ids: Vec<u64>,
    manager: SchedulerManager,
    cancelled: AtomicBool,
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("entries", &self.ids.len())
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

impl SchedulerHandle {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.manager.cancel_ids(&self.ids);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Scheduler constructors bound to one service context. Jobs run inside the
/// safeExec envelope: a failing execution is logged against the context and
/// never stops future ticks.
#[derive(Clone)]
pub struct ServiceScheduler {
    context: String,
    manager: SchedulerManager,
}

impl ServiceScheduler {
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Register one cron entry per expression. Entries start at `Ready` and
    /// the returned handle cancels all of them.
    pub fn cron<F, Fut>(
        &self,
        expressions: &[&str],
        f: F,
    ) -> Result<SchedulerHandle, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        let schedules = expressions
            .iter()
            .map(|expr| {
                cron::Schedule::from_str(expr).map_err(|e| SchedulerError::InvalidCronExpression {
                    expression: expr.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exec = job_exec(f);
        let ids = schedules
            .into_iter()
            .map(|schedule| {
                self.manager
                    .register(&self.context, JobSpec::Cron { schedule }, exec.clone())
            })
            .collect();
        Ok(SchedulerHandle {
            ids,
            manager: self.manager.clone(),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Fixed-period timer, first firing one period after `Ready`.
    pub fn interval<F, Fut>(&self, period: Duration, f: F) -> SchedulerHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        let id = self
            .manager
            .register(&self.context, JobSpec::Interval { period }, job_exec(f));
        SchedulerHandle {
            ids: vec![id],
            manager: self.manager.clone(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Sliding timer: on each tick of `reset_expression`, `next` computes the
    /// next execution instant and a one-shot is scheduled for it.
    pub fn sliding<N, F, Fut>(
        &self,
        reset_expression: &str,
        next: N,
        f: F,
    ) -> Result<SchedulerHandle, SchedulerError>
    where
        N: Fn() -> Option<DateTime<Utc>> + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        let reset = cron::Schedule::from_str(reset_expression).map_err(|e| {
            SchedulerError::InvalidCronExpression {
                expression: reset_expression.to_string(),
                message: e.to_string(),
            }
        })?;
        let id = self.manager.register(
            &self.context,
            JobSpec::Sliding {
                reset,
                next: Arc::new(next),
            },
            job_exec(f),
        );
        Ok(SchedulerHandle {
            ids: vec![id],
            manager: self.manager.clone(),
            cancelled: AtomicBool::new(false),
        })
    }
}
