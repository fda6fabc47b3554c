//! Application bootstrap and teardown.
//!
//! A [`Kernel`] value owns every mutable map the runtime needs: the resolved
//! configuration, the lifecycle engine, the scheduler's job table and the
//! service container. At most one application is active per process,
//! enforced by a single process-wide slot; `bootstrap()` returns a typed
//! failure instead of exiting, leaving exit-code policy to the binary.
//!
//! Boot order: the built-in boilerplate module wires first and registers its
//! schema; termination handlers install; libraries mount in dependency
//! order, then the application; the bootstrap configuration overlay merges;
//! then the lifecycle runs PreInit, the loaders, PostConfig, Bootstrap and
//! Ready, after which the scheduler starts and the process stays up until a
//! termination signal or an explicit teardown.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::cache::{provider_for, CacheProvider};
use crate::config::error::ConfigError;
use crate::config::loader::{dotenv, run_loaders, CliSwitches, LoaderContext};
use crate::config::manager::ConfigManager;
use crate::config::schema::ConfigValue;
use crate::container::boilerplate::boilerplate_library;
use crate::container::wiring::{ServiceContainer, WiringFacilities};
use crate::event::EventBus;
use crate::kernel::constants::{BOILERPLATE_MODULE, CACHE_PREFIX_KEY, CACHE_PROVIDER_KEY};
use crate::kernel::error::{Error, Result};
use crate::lifecycle::{LifecycleEngine, Stage};
use crate::registry::definition::{ApplicationDefinition, LibraryDefinition};
use crate::registry::planner::order_libraries;
use crate::scheduler::manager::SchedulerManager;

/// The single-slot record of the active application in this process.
static ACTIVE_APPLICATION: Mutex<Option<String>> = Mutex::new(None);

fn acquire_slot(name: &str) -> Result<()> {
    let mut slot = ACTIVE_APPLICATION.lock().expect("active slot poisoned");
    if let Some(active) = slot.as_deref() {
        return Err(Error::NoDualBoot {
            active: active.to_string(),
            requested: name.to_string(),
        });
    }
    *slot = Some(name.to_string());
    Ok(())
}

fn release_slot() {
    *ACTIVE_APPLICATION.lock().expect("active slot poisoned") = None;
}

/// Options accepted by [`ApplicationDefinition::bootstrap`].
///
/// `argv` and `env` default to the real process state; tests inject both to
/// stay deterministic. `configuration` is merged after every loader and
/// therefore wins over CLI, environment, files and defaults.
pub struct BootstrapOptions {
    /// Highest-precedence configuration overlay, module -> key -> value.
    pub configuration: HashMap<String, HashMap<String, ConfigValue>>,
    /// Command line; defaults to `std::env::args()`.
    pub argv: Option<Vec<String>>,
    /// Environment snapshot; defaults to `std::env::vars()`.
    pub env: Option<BTreeMap<String, String>>,
    /// Dotenv file, used when no `--env-file` switch is present.
    pub env_file: Option<PathBuf>,
    /// Root of the system config tree; `/etc` unless a test redirects it.
    pub etc_root: Option<PathBuf>,
    /// Install SIGTERM/SIGINT handlers. On by default; tests turn it off.
    pub handle_signals: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            configuration: HashMap::new(),
            argv: None,
            env: None,
            env_file: None,
            etc_root: None,
            handle_signals: true,
        }
    }
}

/// Owner of all runtime state for one booted application.
struct Kernel {
    config: ConfigManager,
    engine: LifecycleEngine,
    scheduler: SchedulerManager,
    container: ServiceContainer,
    cache: Arc<dyn CacheProvider>,
    event: Arc<EventBus>,
}

impl Kernel {
    fn new(cache: Arc<dyn CacheProvider>) -> Self {
        Self {
            config: ConfigManager::new(),
            engine: LifecycleEngine::new(),
            scheduler: SchedulerManager::new(),
            container: ServiceContainer::new(),
            cache,
            event: Arc::new(EventBus::new()),
        }
    }

    fn facilities(&self) -> WiringFacilities {
        WiringFacilities {
            config: self.config.clone(),
            scheduler: self.scheduler.clone(),
            cache: self.cache.clone(),
            event: self.event.clone(),
        }
    }

    /// Register a library's schema, bind its handles and wire its services.
    async fn mount_library(&mut self, library: &Arc<LibraryDefinition>) -> Result<()> {
        self.config
            .load_project(library.name(), library.config_schema().to_vec())?;
        library.lifecycle().bind(&self.engine);
        library.bind_config(&self.config);
        let facilities = self.facilities();
        self.container
            .wire_module(
                &facilities,
                library.lifecycle(),
                library.name(),
                library.priority_init(),
                library.services(),
            )
            .await
    }

    async fn mount_application(&mut self, app: &ApplicationDefinition) -> Result<()> {
        self.config
            .load_project(app.name(), app.config_schema().to_vec())?;
        app.lifecycle().bind(&self.engine);
        app.bind_config(&self.config);
        let facilities = self.facilities();
        self.container
            .wire_module(
                &facilities,
                app.lifecycle(),
                app.name(),
                app.priority_init(),
                app.services(),
            )
            .await
    }

    async fn run_stage(&self, stage: Stage) -> Result<()> {
        let duration = self.engine.run_stage(stage).await?;
        log::info!("{} completed in {:?}", stage, duration);
        self.engine.drain_deferred().await;
        Ok(())
    }
}

impl ApplicationDefinition {
    /// Boot this application. See the module docs for the exact sequence.
    pub async fn bootstrap(&self, options: BootstrapOptions) -> Result<Application> {
        if self.is_booted() {
            return Err(Error::DoubleBoot {
                application: self.name().to_string(),
            });
        }
        acquire_slot(self.name())?;

        match self.boot_inner(options).await {
            Ok(application) => {
                self.set_booted(true);
                Ok(application)
            }
            Err(e) => {
                if let Error::Config(ConfigError::MissingRequired(_)) = &e {
                    eprintln!("{}", e);
                }
                self.lifecycle().unbind();
                self.unbind_config();
                for library in self.libraries() {
                    library.lifecycle().unbind();
                    library.unbind_config();
                }
                release_slot();
                Err(e)
            }
        }
    }

    async fn boot_inner(&self, options: BootstrapOptions) -> Result<Application> {
        log::info!(
            "bootstrapping application '{}' ({} libraries)",
            self.name(),
            self.libraries().len()
        );

        // Environment snapshot, switches and dotenv preload come first so
        // every later step sees the same view of the outside world.
        let argv: Vec<String> = options
            .argv
            .clone()
            .unwrap_or_else(|| std::env::args().collect());
        let switches = CliSwitches::parse(&argv);
        let mut env: BTreeMap<String, String> = options
            .env
            .clone()
            .unwrap_or_else(|| std::env::vars().collect());
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        dotenv::preload(&mut env, &switches, options.env_file.as_deref(), &cwd);

        // The cache exists before configuration resolves, so its provider
        // and prefix come straight from switches and environment.
        let cache = {
            let env_entries: Vec<(String, String)> =
                env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let lookup = |key: &str| -> Option<String> {
                switches.find(key).map(str::to_string).or_else(|| {
                    crate::config::loader::lookup_entry(&env_entries, BOILERPLATE_MODULE, key)
                        .map(str::to_string)
                })
            };
            let provider = lookup(CACHE_PROVIDER_KEY).unwrap_or_else(|| "memory".to_string());
            provider_for(&provider, lookup(CACHE_PREFIX_KEY))
        };

        let mut kernel = Kernel::new(cache);

        // The boilerplate module wires first, in isolation, so every other
        // module finds the shared facilities already in place.
        let boilerplate = boilerplate_library()?;
        kernel.mount_library(&boilerplate).await?;

        // Termination handlers belong to the kernel, not to services.
        let shutdown = Arc::new(Notify::new());
        let signal_task = if options.handle_signals {
            Some(spawn_signal_watcher(shutdown.clone()))
        } else {
            None
        };

        // Libraries mount in dependency order, then the application itself.
        let libraries = order_libraries(self)?;
        for library in &libraries {
            kernel.mount_library(library).await?;
        }
        kernel.mount_application(self).await?;

        kernel.run_stage(Stage::PreInit).await?;

        let ctx = LoaderContext {
            app_module: self.name().to_string(),
            env,
            switches,
            cwd,
            etc_root: options.etc_root.clone().unwrap_or_else(|| PathBuf::from("/etc")),
        };
        kernel.config.seal();
        run_loaders(&kernel.config, &ctx);
        kernel.config.merge(&options.configuration);
        kernel.config.validate_required()?;

        kernel.run_stage(Stage::PostConfig).await?;
        kernel.run_stage(Stage::Bootstrap).await?;
        kernel.run_stage(Stage::Ready).await?;
        kernel.scheduler.start();
        kernel.container.seal();

        log::info!("application '{}' is ready", self.name());
        Ok(Application {
            definition: self.clone(),
            libraries,
            kernel,
            shutdown,
            signal_task,
            active: true,
        })
    }
}

fn spawn_signal_watcher(shutdown: Arc<Notify>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("cannot install SIGTERM handler: {}", e);
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("cannot install SIGINT handler: {}", e);
                    return;
                }
            };
            tokio::select! {
                _ = sigterm.recv() => log::info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => log::info!("received SIGINT, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("cannot wait for ctrl-c: {}", e);
                return;
            }
            log::info!("received interrupt, shutting down");
        }
        shutdown.notify_one();
    })
}

/// A running application, returned by [`ApplicationDefinition::bootstrap`].
pub struct Application {
    definition: ApplicationDefinition,
    libraries: Vec<Arc<LibraryDefinition>>,
    kernel: Kernel,
    shutdown: Arc<Notify>,
    signal_task: Option<tokio::task::JoinHandle<()>>,
    active: bool,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.definition.name())
            .field("active", &self.active)
            .finish()
    }
}

impl Application {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &ApplicationDefinition {
        &self.definition
    }

    pub fn config(&self) -> &ConfigManager {
        &self.kernel.config
    }

    pub fn scheduler(&self) -> &SchedulerManager {
        &self.kernel.scheduler
    }

    pub fn cache(&self) -> &Arc<dyn CacheProvider> {
        &self.kernel.cache
    }

    pub fn event(&self) -> &Arc<EventBus> {
        &self.kernel.event
    }

    pub fn container(&self) -> &ServiceContainer {
        &self.kernel.container
    }

    /// Stages the lifecycle has completed, for introspection.
    pub fn completed_stages(&self) -> Vec<Stage> {
        self.kernel.engine.completed_stages()
    }

    /// Wait until a termination signal arrives.
    pub async fn wait_for_shutdown(&self) {
        self.shutdown.notified().await;
    }

    /// Block until a termination signal, then tear down.
    pub async fn run_until_signal(mut self) -> Result<()> {
        self.wait_for_shutdown().await;
        self.teardown().await
    }

    /// Wind the application down: the scheduler drains, PreShutdown,
    /// ShutdownStart and ShutdownComplete run, handlers detach, and the
    /// process-wide slot frees so the same definition can bootstrap again.
    ///
    /// Calling teardown when nothing is active logs and returns.
    pub async fn teardown(&mut self) -> Result<()> {
        if !self.active {
            log::info!("teardown called with no active application");
            return Ok(());
        }
        log::info!("tearing down application '{}'", self.definition.name());

        // Future ticks stop here; in-flight jobs may finish during
        // PreShutdown but nothing waits for them past it.
        self.kernel.scheduler.stop();
        for stage in [Stage::PreShutdown, Stage::ShutdownStart, Stage::ShutdownComplete] {
            if let Err(e) = self.kernel.engine.run_stage(stage).await {
                log::error!("{} during {}: {}", e.code(), stage, e);
            }
        }

        if let Some(task) = self.signal_task.take() {
            task.abort();
        }

        self.kernel.engine.reset();
        self.kernel.container.clear();
        self.kernel.event.clear();

        self.definition.lifecycle().unbind();
        self.definition.unbind_config();
        for library in &self.libraries {
            library.lifecycle().unbind();
            library.unbind_config();
        }

        release_slot();
        self.definition.set_booted(false);
        self.active = false;
        log::info!("teardown complete");
        Ok(())
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        // Safety net for callers that drop without tearing down: free the
        // process slot and stop timers so the process can boot again.
        if self.active {
            log::warn!(
                "application '{}' dropped without teardown",
                self.definition.name()
            );
            self.kernel.scheduler.stop();
            if let Some(task) = self.signal_task.take() {
                task.abort();
            }
            self.definition.set_booted(false);
            release_slot();
        }
    }
}
