//! The parameter bundle injected into every service factory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::CacheProvider;
use crate::config::error::ConfigError;
use crate::config::manager::{ConfigManager, ConfigUpdate};
use crate::config::schema::ConfigValue;
use crate::event::EventBus;
use crate::lifecycle::ModuleLifecycle;
use crate::logging::Logger;
use crate::registry::definition::ServiceApi;
use crate::scheduler::manager::ServiceScheduler;

/// Read-through configuration view bound to one module, with the global API
/// alongside.
#[derive(Clone, Debug)]
pub struct ConfigView {
    module: String,
    manager: ConfigManager,
}

impl ConfigView {
    pub(crate) fn new(module: impl Into<String>, manager: ConfigManager) -> Self {
        Self {
            module: module.into(),
            manager,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Read one of this module's own keys.
    pub fn get(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        self.manager.get(&self.module, key)
    }

    /// Write one of this module's own keys; update watchers fire
    /// synchronously.
    pub fn set(&self, key: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        self.manager.set(&self.module, key, value)
    }

    /// Read any module's key.
    pub fn get_global(&self, module: &str, key: &str) -> Result<ConfigValue, ConfigError> {
        self.manager.get(module, key)
    }

    /// Write any module's key.
    pub fn set_global(
        &self,
        module: &str,
        key: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigError> {
        self.manager.set(module, key, value)
    }

    /// Registered module names.
    pub fn keys(&self) -> Vec<String> {
        self.manager.keys()
    }

    pub fn has(&self, module: &str) -> bool {
        self.manager.has(module)
    }

    /// Watch for `set` calls, optionally filtered by module and key (key
    /// filters match case-insensitively).
    pub fn on_update<F>(&self, callback: F, module: Option<&str>, key: Option<&str>) -> u64
    where
        F: Fn(&ConfigUpdate) + Send + Sync + 'static,
    {
        self.manager.on_update(callback, module, key)
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}

/// Resolved APIs of every service wired before this one, keyed by
/// `(module, service)`.
#[derive(Clone, Default)]
pub struct Peers {
    apis: HashMap<String, HashMap<String, ServiceApi>>,
}

impl std::fmt::Debug for Peers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count: usize = self.apis.values().map(|m| m.len()).sum();
        f.debug_struct("Peers").field("apis", &count).finish()
    }
}

impl Peers {
    pub(crate) fn from_snapshot(apis: HashMap<String, HashMap<String, ServiceApi>>) -> Self {
        Self { apis }
    }

    /// Typed access to a peer API.
    pub fn get<T: Send + Sync + 'static>(&self, module: &str, service: &str) -> Option<Arc<T>> {
        self.api(module, service)
            .and_then(|api| Arc::downcast::<T>(api).ok())
    }

    /// Untyped access to a peer API.
    pub fn api(&self, module: &str, service: &str) -> Option<ServiceApi> {
        self.apis.get(module).and_then(|m| m.get(service)).cloned()
    }

    /// Module names visible in this snapshot.
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.apis.keys().cloned().collect();
        modules.sort();
        modules
    }
}

/// Everything a service factory receives.
#[derive(Clone)]
pub struct ServiceParams {
    /// `"<module>:<service>"`, used in logs and handed to the scheduler.
    pub context: String,
    /// Logger pre-tagged with the context.
    pub logger: Logger,
    /// Config view bound to the owning module.
    pub config: ConfigView,
    /// The owning module's lifecycle handle.
    pub lifecycle: ModuleLifecycle,
    /// Scheduler constructors bound to the context.
    pub scheduler: ServiceScheduler,
    /// Process-wide cache.
    pub cache: Arc<dyn CacheProvider>,
    /// Process-wide event bus.
    pub event: Arc<EventBus>,
    /// APIs of every service wired earlier.
    pub peers: Peers,
}

impl std::fmt::Debug for ServiceParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceParams")
            .field("context", &self.context)
            .field("peers", &self.peers)
            .finish()
    }
}
