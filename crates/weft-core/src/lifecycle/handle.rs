//! Per-module lifecycle handles.
//!
//! Definitions are built before any kernel exists, so a module's lifecycle
//! handle starts detached: callbacks buffer inside it. When the kernel
//! mounts the module the handle binds to the engine and the buffer drains;
//! at teardown it detaches again so the definition can be re-bootstrapped.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::lifecycle::engine::LifecycleEngine;
use crate::lifecycle::{CallbackResult, Stage, StageCallback};

struct Pending {
    stage: Stage,
    priority: Option<i64>,
    callback: StageCallback,
}

enum Binding {
    Detached(Vec<Pending>),
    Bound(LifecycleEngine),
}

/// Lifecycle handle scoped to one module.
#[derive(Clone)]
pub struct ModuleLifecycle {
    module: String,
    binding: Arc<Mutex<Binding>>,
}

impl std::fmt::Debug for ModuleLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = matches!(
            *self.binding.lock().expect("lifecycle binding poisoned"),
            Binding::Bound(_)
        );
        f.debug_struct("ModuleLifecycle")
            .field("module", &self.module)
            .field("bound", &bound)
            .finish()
    }
}

impl ModuleLifecycle {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            binding: Arc::new(Mutex::new(Binding::Detached(Vec::new()))),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Bind to an engine and flush buffered callbacks into it.
    pub(crate) fn bind(&self, engine: &LifecycleEngine) {
        engine.register_module(&self.module);
        let mut binding = self.binding.lock().expect("lifecycle binding poisoned");
        if let Binding::Detached(pending) = &mut *binding {
            for item in pending.drain(..) {
                engine.attach(&self.module, item.stage, item.priority, item.callback);
            }
        }
        *binding = Binding::Bound(engine.clone());
    }

    /// Detach from the engine; subsequent callbacks buffer until the next
    /// bootstrap binds the module again.
    pub(crate) fn unbind(&self) {
        let mut binding = self.binding.lock().expect("lifecycle binding poisoned");
        *binding = Binding::Detached(Vec::new());
    }

    /// Attach a callback for a stage with an optional priority.
    pub fn attach<F, Fut>(&self, stage: Stage, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        let boxed: StageCallback = Box::new(move || Box::pin(callback()));
        let mut binding = self.binding.lock().expect("lifecycle binding poisoned");
        match &mut *binding {
            Binding::Bound(engine) => engine.attach(&self.module, stage, priority, boxed),
            Binding::Detached(pending) => pending.push(Pending {
                stage,
                priority,
                callback: boxed,
            }),
        }
    }

    pub fn on_pre_init<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::PreInit, priority, callback);
    }

    pub fn on_post_config<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::PostConfig, priority, callback);
    }

    pub fn on_bootstrap<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::Bootstrap, priority, callback);
    }

    pub fn on_ready<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::Ready, priority, callback);
    }

    /// Runs strictly before `ShutdownStart`; the point where schedulers and
    /// other resource holders quiesce.
    pub fn on_pre_shutdown<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::PreShutdown, priority, callback);
    }

    pub fn on_shutdown_start<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::ShutdownStart, priority, callback);
    }

    pub fn on_shutdown_complete<F, Fut>(&self, priority: Option<i64>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.attach(Stage::ShutdownComplete, priority, callback);
    }
}
