//! Owner of the resolved configuration tree.
//!
//! Module schemas register at wire time and seed their defaults; the loaders
//! then overlay file, environment and CLI values in precedence order, and a
//! bootstrap-supplied partial wins over everything. After loading, values
//! only change through [`ConfigManager::set`], which dispatches update
//! watchers synchronously.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::error::ConfigError;
use crate::config::schema::{coerce_value, ConfigSpec, ConfigValue};

/// Update notification passed to watchers.
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub module: String,
    pub key: String,
    pub value: ConfigValue,
}

type WatchFn = Arc<dyn Fn(&ConfigUpdate) + Send + Sync>;

struct Watcher {
    id: u64,
    module: Option<String>,
    key: Option<String>,
    callback: WatchFn,
}

impl Watcher {
    fn matches(&self, module: &str, key: &str) -> bool {
        if let Some(want) = &self.module {
            if want != module {
                return false;
            }
        }
        if let Some(want) = &self.key {
            if !want.eq_ignore_ascii_case(key) {
                return false;
            }
        }
        true
    }
}

struct ConfigState {
    /// Schema per module; BTreeMap keeps loader iteration deterministic.
    schemas: HashMap<String, BTreeMap<String, ConfigSpec>>,
    /// Resolved values, module -> key -> value.
    values: HashMap<String, HashMap<String, ConfigValue>>,
    /// Module registration order.
    module_order: Vec<String>,
    /// Set once the loaders have run; schema registration is rejected after.
    sealed: bool,
}

/// Configuration manager. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ConfigManager {
    state: Arc<RwLock<ConfigState>>,
    watchers: Arc<RwLock<Vec<Watcher>>>,
    next_watcher_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("config lock poisoned");
        f.debug_struct("ConfigManager")
            .field("modules", &state.module_order)
            .field("sealed", &state.sealed)
            .finish()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ConfigState {
                schemas: HashMap::new(),
                values: HashMap::new(),
                module_order: Vec::new(),
                sealed: false,
            })),
            watchers: Arc::new(RwLock::new(Vec::new())),
            next_watcher_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a module's schema and seed its defaults.
    pub fn load_project<I>(&self, module: &str, schema: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, ConfigSpec)>,
    {
        let mut state = self.state.write().expect("config lock poisoned");
        if state.sealed {
            return Err(ConfigError::LateConfigure {
                module: module.to_string(),
            });
        }
        if state.schemas.contains_key(module) {
            return Err(ConfigError::ModuleAlreadyRegistered(module.to_string()));
        }

        let schema: BTreeMap<String, ConfigSpec> = schema.into_iter().collect();
        let defaults: HashMap<String, ConfigValue> = schema
            .iter()
            .filter_map(|(key, spec)| spec.default.clone().map(|v| (key.clone(), v)))
            .collect();

        state.schemas.insert(module.to_string(), schema);
        state.values.insert(module.to_string(), defaults);
        state.module_order.push(module.to_string());
        Ok(())
    }

    /// Reject further schema registration; called once the loaders run.
    pub(crate) fn seal(&self) {
        self.state.write().expect("config lock poisoned").sealed = true;
    }

    /// Typed read. Key lookup is case-insensitive.
    pub fn get(&self, module: &str, key: &str) -> Result<ConfigValue, ConfigError> {
        let state = self.state.read().expect("config lock poisoned");
        let canonical = canonical_key(&state, module, key)?;
        state
            .values
            .get(module)
            .and_then(|entries| entries.get(&canonical))
            .cloned()
            .ok_or_else(|| ConfigError::Unset {
                module: module.to_string(),
                key: canonical,
            })
    }

    /// Write a value and notify matching watchers synchronously, in
    /// registration order, after the value is in place.
    pub fn set(
        &self,
        module: &str,
        key: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::NonLeafWrite {
                module: module.to_string(),
            });
        }

        let update = {
            let mut state = self.state.write().expect("config lock poisoned");
            let canonical = canonical_key(&state, module, key)?;
            let spec = state
                .schemas
                .get(module)
                .and_then(|schema| schema.get(&canonical))
                .cloned()
                .expect("canonical key must have a spec");

            let value = coerce_value(&spec, value.into()).map_err(|actual| {
                ConfigError::TypeMismatch {
                    module: module.to_string(),
                    key: canonical.clone(),
                    expected: spec.kind,
                    actual,
                }
            })?;

            state
                .values
                .get_mut(module)
                .expect("registered module must have a value table")
                .insert(canonical.clone(), value.clone());

            ConfigUpdate {
                module: module.to_string(),
                key: canonical,
                value,
            }
        };

        let matching: Vec<WatchFn> = {
            let watchers = self.watchers.read().expect("watcher lock poisoned");
            watchers
                .iter()
                .filter(|w| w.matches(&update.module, &update.key))
                .map(|w| w.callback.clone())
                .collect()
        };
        for callback in matching {
            callback(&update);
        }
        Ok(())
    }

    /// Register an update watcher, optionally filtered by module and key.
    /// Key filters match case-insensitively.
    pub fn on_update<F>(&self, callback: F, module: Option<&str>, key: Option<&str>) -> u64
    where
        F: Fn(&ConfigUpdate) + Send + Sync + 'static,
    {
        let id = self.next_watcher_id.fetch_add(1, Ordering::SeqCst);
        self.watchers
            .write()
            .expect("watcher lock poisoned")
            .push(Watcher {
                id,
                module: module.map(str::to_string),
                key: key.map(str::to_string),
                callback: Arc::new(callback),
            });
        id
    }

    /// Remove a watcher by id.
    pub fn remove_watcher(&self, id: u64) -> bool {
        let mut watchers = self.watchers.write().expect("watcher lock poisoned");
        let before = watchers.len();
        watchers.retain(|w| w.id != id);
        watchers.len() < before
    }

    /// Registered module names, in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .expect("config lock poisoned")
            .module_order
            .clone()
    }

    pub fn has(&self, module: &str) -> bool {
        self.state
            .read()
            .expect("config lock poisoned")
            .schemas
            .contains_key(module)
    }

    /// Config keys declared by a module.
    pub fn entries(&self, module: &str) -> Result<Vec<String>, ConfigError> {
        let state = self.state.read().expect("config lock poisoned");
        state
            .schemas
            .get(module)
            .map(|schema| schema.keys().cloned().collect())
            .ok_or_else(|| ConfigError::UnknownModule(module.to_string()))
    }

    /// Deep-merge a partial configuration. Applied after module declarations
    /// and loaders, so bootstrap-supplied values win. Unknown entries are
    /// skipped with a warning; watchers do not fire.
    pub fn merge(&self, partial: &HashMap<String, HashMap<String, ConfigValue>>) {
        for (module, entries) in partial {
            for (key, value) in entries {
                if let Err(e) = self.apply_loaded(module, key, value.clone()) {
                    log::warn!("ignoring merge entry '{}.{}': {}", module, key, e);
                }
            }
        }
    }

    /// Loader-facing write: canonicalises and type-checks but does not fire
    /// watchers (watchers observe runtime `set` calls, not load passes).
    pub(crate) fn apply_loaded(
        &self,
        module: &str,
        key: &str,
        value: ConfigValue,
    ) -> Result<(), ConfigError> {
        let mut state = self.state.write().expect("config lock poisoned");
        let module = canonical_module(&state, module).ok_or_else(|| {
            ConfigError::UnknownModule(module.to_string())
        })?;
        let canonical = canonical_key(&state, &module, key)?;
        let spec = state
            .schemas
            .get(&module)
            .and_then(|schema| schema.get(&canonical))
            .cloned()
            .expect("canonical key must have a spec");
        let value = coerce_value(&spec, value).map_err(|actual| ConfigError::TypeMismatch {
            module: module.clone(),
            key: canonical.clone(),
            expected: spec.kind,
            actual,
        })?;
        state
            .values
            .get_mut(&module)
            .expect("registered module must have a value table")
            .insert(canonical, value);
        Ok(())
    }

    /// Every `(module, key, spec)` triple, module registration order first,
    /// keys alphabetical within a module.
    pub(crate) fn schema_entries(&self) -> Vec<(String, String, ConfigSpec)> {
        let state = self.state.read().expect("config lock poisoned");
        let mut out = Vec::new();
        for module in &state.module_order {
            if let Some(schema) = state.schemas.get(module) {
                for (key, spec) in schema {
                    out.push((module.clone(), key.clone(), spec.clone()));
                }
            }
        }
        out
    }

    /// Resolve a module name case-insensitively against registered modules.
    pub(crate) fn resolve_module(&self, name: &str) -> Option<String> {
        let state = self.state.read().expect("config lock poisoned");
        canonical_module(&state, name)
    }

    /// After loaders and merge: every `required` spec must hold a value.
    pub fn validate_required(&self) -> Result<(), ConfigError> {
        let state = self.state.read().expect("config lock poisoned");
        let mut missing = Vec::new();
        for module in &state.module_order {
            let Some(schema) = state.schemas.get(module) else {
                continue;
            };
            for (key, spec) in schema {
                if !spec.required {
                    continue;
                }
                let present = state
                    .values
                    .get(module)
                    .map(|entries| entries.contains_key(key))
                    .unwrap_or(false);
                if !present {
                    missing.push(format!("{}.{}", module, key));
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingRequired(missing))
        }
    }

    /// Snapshot of the resolved tree, for introspection and tests.
    pub fn resolved(&self) -> HashMap<String, HashMap<String, ConfigValue>> {
        self.state
            .read()
            .expect("config lock poisoned")
            .values
            .clone()
    }

    /// Spec lookup with case-insensitive key resolution.
    pub fn spec(&self, module: &str, key: &str) -> Option<ConfigSpec> {
        let state = self.state.read().expect("config lock poisoned");
        let canonical = canonical_key(&state, module, key).ok()?;
        state
            .schemas
            .get(module)
            .and_then(|schema| schema.get(&canonical))
            .cloned()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_module(state: &ConfigState, name: &str) -> Option<String> {
    if state.schemas.contains_key(name) {
        return Some(name.to_string());
    }
    state
        .module_order
        .iter()
        .find(|module| module.eq_ignore_ascii_case(name))
        .cloned()
}

fn canonical_key(state: &ConfigState, module: &str, key: &str) -> Result<String, ConfigError> {
    let schema = state
        .schemas
        .get(module)
        .ok_or_else(|| ConfigError::UnknownModule(module.to_string()))?;
    if schema.contains_key(key) {
        return Ok(key.to_string());
    }
    schema
        .keys()
        .find(|candidate| candidate.eq_ignore_ascii_case(key))
        .cloned()
        .ok_or_else(|| ConfigError::UnknownKey {
            module: module.to_string(),
            key: key.to_string(),
        })
}
