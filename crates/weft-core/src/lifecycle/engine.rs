//! The lifecycle engine: collects stage callbacks and invokes them in
//! deterministic order.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::{Stage, StageCallback};

struct Entry {
    module: String,
    priority: Option<i64>,
    seq: u64,
    callback: StageCallback,
}

struct EngineState {
    /// Module processing order; the boilerplate module registers first.
    module_order: Vec<String>,
    /// Pending callbacks per stage.
    callbacks: HashMap<Stage, Vec<Entry>>,
    /// Stages that have finished running.
    completed: HashSet<Stage>,
    /// Late attaches to already-completed early stages, drained between
    /// stages and after bootstrap.
    deferred: Vec<Entry>,
    next_seq: u64,
}

/// Shared lifecycle engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LifecycleEngine {
    state: Arc<Mutex<EngineState>>,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("lifecycle lock poisoned");
        f.debug_struct("LifecycleEngine")
            .field("modules", &state.module_order)
            .field("completed", &state.completed)
            .finish()
    }
}

impl LifecycleEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                module_order: Vec::new(),
                callbacks: HashMap::new(),
                completed: HashSet::new(),
                deferred: Vec::new(),
                next_seq: 0,
            })),
        }
    }

    /// Record a module in processing order. Idempotent.
    pub fn register_module(&self, module: &str) {
        let mut state = self.state.lock().expect("lifecycle lock poisoned");
        if !state.module_order.iter().any(|m| m == module) {
            state.module_order.push(module.to_string());
        }
    }

    /// Attach a callback for a stage.
    ///
    /// If the stage already completed: early stages defer the callback to the
    /// next drain point with no error; shutdown stages log at fatal severity
    /// and drop it.
    pub fn attach(&self, module: &str, stage: Stage, priority: Option<i64>, callback: StageCallback) {
        let mut state = self.state.lock().expect("lifecycle lock poisoned");
        let seq = state.next_seq;
        state.next_seq += 1;
        let entry = Entry {
            module: module.to_string(),
            priority,
            seq,
            callback,
        };
        if state.completed.contains(&stage) {
            if stage.is_shutdown() {
                log::error!(
                    "FATAL refusing {} callback from module '{}': stage already completed",
                    stage,
                    module
                );
            } else {
                log::debug!(
                    "deferring {} callback from module '{}': stage already completed",
                    stage,
                    module
                );
                state.deferred.push(entry);
            }
            return;
        }
        state.callbacks.entry(stage).or_default().push(entry);
    }

    pub fn has_completed(&self, stage: Stage) -> bool {
        self.state
            .lock()
            .expect("lifecycle lock poisoned")
            .completed
            .contains(&stage)
    }

    /// Completed stage names, for introspection.
    pub fn completed_stages(&self) -> Vec<Stage> {
        let state = self.state.lock().expect("lifecycle lock poisoned");
        let mut stages: Vec<Stage> = state.completed.iter().copied().collect();
        stages.sort();
        stages
    }

    /// Run every callback attached for a stage and mark it completed.
    ///
    /// Per module: prioritised callbacks first, ascending priority, ties by
    /// attach order, strictly sequential; then unprioritised callbacks
    /// concurrently. Modules run in registration order, so the boilerplate
    /// module finishes before any other module starts. Callbacks attached
    /// for this stage while it is running are picked up before the stage is
    /// declared complete.
    ///
    /// Returns the wall-clock duration of the stage.
    pub async fn run_stage(&self, stage: Stage) -> Result<Duration, LifecycleError> {
        let started = Instant::now();
        let mut failures: Vec<(String, String)> = Vec::new();

        loop {
            let (module_order, batch) = {
                let mut state = self.state.lock().expect("lifecycle lock poisoned");
                let batch = state.callbacks.remove(&stage).unwrap_or_default();
                (state.module_order.clone(), batch)
            };
            if batch.is_empty() {
                break;
            }

            let mut per_module: HashMap<String, Vec<Entry>> = HashMap::new();
            for entry in batch {
                per_module.entry(entry.module.clone()).or_default().push(entry);
            }

            // Modules registered in order first, then any stragglers that
            // attached without registering.
            let mut modules: Vec<String> = module_order
                .iter()
                .filter(|m| per_module.contains_key(*m))
                .cloned()
                .collect();
            let mut extra: Vec<String> = per_module
                .keys()
                .filter(|m| !module_order.contains(m))
                .cloned()
                .collect();
            extra.sort();
            modules.extend(extra);

            for module in modules {
                let entries = per_module.remove(&module).unwrap_or_default();
                let (mut prioritised, unordered): (Vec<Entry>, Vec<Entry>) =
                    entries.into_iter().partition(|e| e.priority.is_some());
                prioritised.sort_by_key(|e| (e.priority.unwrap_or(i64::MAX), e.seq));

                for entry in prioritised {
                    if let Err(e) = (entry.callback)().await {
                        log::error!(
                            "UserCallbackFailure in {} for '{}': {}",
                            stage,
                            entry.module,
                            e
                        );
                        failures.push((entry.module, e.to_string()));
                    }
                }

                let results = join_all(
                    unordered
                        .into_iter()
                        .map(|entry| async move { (entry.module, (entry.callback)().await) }),
                )
                .await;
                for (module, result) in results {
                    if let Err(e) = result {
                        log::error!("UserCallbackFailure in {} for '{}': {}", stage, module, e);
                        failures.push((module, e.to_string()));
                    }
                }
            }
        }

        self.state
            .lock()
            .expect("lifecycle lock poisoned")
            .completed
            .insert(stage);

        let elapsed = started.elapsed();
        log::debug!("lifecycle stage {} completed in {:?}", stage, elapsed);

        if stage.aborts_on_failure() {
            if let Some((module, message)) = failures.into_iter().next() {
                return Err(LifecycleError::UserCallbackFailure {
                    stage,
                    module,
                    message,
                });
            }
        }
        Ok(elapsed)
    }

    /// Run deferred late-attach callbacks. Failures are logged only.
    pub async fn drain_deferred(&self) {
        let entries: Vec<Entry> = {
            let mut state = self.state.lock().expect("lifecycle lock poisoned");
            std::mem::take(&mut state.deferred)
        };
        for entry in entries {
            if let Err(e) = (entry.callback)().await {
                log::error!(
                    "UserCallbackFailure in deferred callback for '{}': {}",
                    entry.module,
                    e
                );
            }
        }
    }

    /// Clear all recorded state: completed stages, pending callbacks, the
    /// deferred queue and the module order. Called at teardown so the next
    /// bootstrap starts clean.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("lifecycle lock poisoned");
        state.callbacks.clear();
        state.completed.clear();
        state.deferred.clear();
        state.module_order.clear();
    }
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new()
    }
}
