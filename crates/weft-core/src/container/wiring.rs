//! Service wiring.
//!
//! The container invokes each service factory exactly once, in plan order,
//! with the injected parameter bundle. Wiring is strictly sequential: a
//! factory observes the APIs of every service wired before it and nothing
//! else. After bootstrap the container seals and the loaded map is
//! read-only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::CacheProvider;
use crate::config::manager::ConfigManager;
use crate::container::error::ContainerError;
use crate::container::params::{ConfigView, Peers, ServiceParams};
use crate::event::EventBus;
use crate::kernel::error::Result;
use crate::lifecycle::ModuleLifecycle;
use crate::logging::Logger;
use crate::registry::definition::{ServiceApi, ServiceFactory};
use crate::registry::planner::wire_order;
use crate::scheduler::manager::SchedulerManager;

/// Shared collaborators injected into every parameter bundle.
#[derive(Clone)]
pub struct WiringFacilities {
    pub config: ConfigManager,
    pub scheduler: SchedulerManager,
    pub cache: Arc<dyn CacheProvider>,
    pub event: Arc<EventBus>,
}

/// Holds the APIs of every wired service.
pub struct ServiceContainer {
    loaded: HashMap<String, HashMap<String, ServiceApi>>,
    wired: HashSet<(String, String)>,
    module_order: Vec<String>,
    sealed: bool,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("modules", &self.module_order)
            .field("services", &self.wired.len())
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self {
            loaded: HashMap::new(),
            wired: HashSet::new(),
            module_order: Vec::new(),
            sealed: false,
        }
    }

    /// Invoke one service factory and record its exported API.
    ///
    /// A factory failure is logged at fatal severity and surfaces as
    /// [`ContainerError::ServiceFactoryFailure`]; wiring errors are not
    /// recoverable.
    pub async fn wire_service(
        &mut self,
        facilities: &WiringFacilities,
        lifecycle: &ModuleLifecycle,
        module: &str,
        service: &str,
        factory: &ServiceFactory,
    ) -> std::result::Result<(), ContainerError> {
        let context = format!("{}:{}", module, service);
        if self.sealed {
            return Err(ContainerError::LateServerRegister { context });
        }
        let binding = (module.to_string(), service.to_string());
        if self.wired.contains(&binding) {
            return Err(ContainerError::DuplicateService {
                module: module.to_string(),
                service: service.to_string(),
            });
        }

        let logger = Logger::tagged(context.clone());
        let params = ServiceParams {
            context: context.clone(),
            logger: logger.clone(),
            config: ConfigView::new(module, facilities.config.clone()),
            lifecycle: lifecycle.clone(),
            scheduler: facilities.scheduler.for_context(context.clone()),
            cache: facilities.cache.clone(),
            event: facilities.event.clone(),
            peers: self.peers(),
        };

        log::trace!("wiring service {}", context);
        match (factory)(params).await {
            Ok(api) => {
                self.wired.insert(binding);
                if !self.module_order.iter().any(|m| m == module) {
                    self.module_order.push(module.to_string());
                }
                if let Some(api) = api {
                    self.loaded
                        .entry(module.to_string())
                        .or_default()
                        .insert(service.to_string(), api);
                }
                Ok(())
            }
            Err(e) => {
                logger.fatal(&format!("ServiceFactoryFailure: {}", e));
                Err(ContainerError::ServiceFactoryFailure {
                    context,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Wire every service of a module in plan order.
    pub async fn wire_module(
        &mut self,
        facilities: &WiringFacilities,
        lifecycle: &ModuleLifecycle,
        module: &str,
        priority_init: &[String],
        services: &[(String, ServiceFactory)],
    ) -> Result<()> {
        let order = wire_order(module, priority_init, services)?;
        let by_name: HashMap<&str, &ServiceFactory> = services
            .iter()
            .map(|(name, factory)| (name.as_str(), factory))
            .collect();
        for service in &order {
            let factory = by_name
                .get(service.as_str())
                .expect("wire order only names declared services");
            self.wire_service(facilities, lifecycle, module, service, factory)
                .await?;
        }
        Ok(())
    }

    /// Snapshot of everything wired so far, for the next bundle.
    pub fn peers(&self) -> Peers {
        Peers::from_snapshot(self.loaded.clone())
    }

    pub fn api(&self, module: &str, service: &str) -> Option<ServiceApi> {
        self.loaded.get(module).and_then(|m| m.get(service)).cloned()
    }

    /// Modules wired, in wiring order.
    pub fn loaded_modules(&self) -> Vec<String> {
        self.module_order.clone()
    }

    pub fn is_wired(&self, module: &str, service: &str) -> bool {
        self.wired
            .contains(&(module.to_string(), service.to_string()))
    }

    /// Reject further wiring; called once bootstrap finishes.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Drop every binding; called at teardown.
    pub fn clear(&mut self) {
        self.loaded.clear();
        self.wired.clear();
        self.module_order.clear();
        self.sealed = false;
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}
