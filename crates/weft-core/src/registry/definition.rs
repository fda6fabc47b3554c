//! Library and application definitions.
//!
//! Definitions are pure data plus service factories: building one validates
//! it but mounts nothing. Mounting happens during bootstrap, when the kernel
//! binds each definition's lifecycle handle and configuration view, orders
//! the libraries, and invokes every service factory exactly once.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::manager::ConfigManager;
use crate::config::schema::{ConfigSpec, ConfigValue};
use crate::container::params::ServiceParams;
use crate::lifecycle::ModuleLifecycle;
use crate::registry::error::RegistryError;

/// Exported API of a wired service, downcast by peers to its concrete type.
pub type ServiceApi = Arc<dyn Any + Send + Sync>;

/// Result of a service factory: an exported API, or nothing.
pub type FactoryResult =
    std::result::Result<Option<ServiceApi>, Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Owned future returned by a service factory.
pub type FactoryFuture = Pin<Box<dyn Future<Output = FactoryResult> + Send + 'static>>;

/// A service factory. Invoked exactly once, during wiring, with the injected
/// parameter bundle.
pub type ServiceFactory = Arc<dyn Fn(ServiceParams) -> FactoryFuture + Send + Sync>;

/// Wrap an async function as a [`ServiceFactory`].
pub fn service_factory<F, Fut>(f: F) -> ServiceFactory
where
    F: Fn(ServiceParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FactoryResult> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// A library: a named bundle of services with a config schema and declared
/// dependencies on other libraries.
pub struct LibraryDefinition {
    name: String,
    config_schema: Vec<(String, ConfigSpec)>,
    services: Vec<(String, ServiceFactory)>,
    priority_init: Vec<String>,
    depends: Vec<Arc<LibraryDefinition>>,
    lifecycle: ModuleLifecycle,
    config_binding: Mutex<Option<ConfigManager>>,
}

impl std::fmt::Debug for LibraryDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryDefinition")
            .field("name", &self.name)
            .field("services", &self.services.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("depends", &self.depends.iter().map(|d| d.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl LibraryDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_schema(&self) -> &[(String, ConfigSpec)] {
        &self.config_schema
    }

    pub fn services(&self) -> &[(String, ServiceFactory)] {
        &self.services
    }

    pub fn priority_init(&self) -> &[String] {
        &self.priority_init
    }

    pub fn depends(&self) -> &[Arc<LibraryDefinition>] {
        &self.depends
    }

    /// Lifecycle handle for this library. Callbacks attached before
    /// bootstrap buffer until the library is mounted.
    pub fn lifecycle(&self) -> &ModuleLifecycle {
        &self.lifecycle
    }

    /// Resolved config read for this library's own keys. Only available
    /// while the library is mounted in a running application.
    pub fn get_config(&self, key: &str) -> crate::kernel::error::Result<ConfigValue> {
        let binding = self.config_binding.lock().expect("config binding poisoned");
        match &*binding {
            Some(manager) => Ok(manager.get(&self.name, key)?),
            None => Err(RegistryError::NotMounted {
                module: self.name.clone(),
            }
            .into()),
        }
    }

    pub(crate) fn bind_config(&self, manager: &ConfigManager) {
        *self.config_binding.lock().expect("config binding poisoned") = Some(manager.clone());
    }

    pub(crate) fn unbind_config(&self) {
        *self.config_binding.lock().expect("config binding poisoned") = None;
    }
}

/// Builder for [`LibraryDefinition`]. Validation happens in [`build`].
///
/// [`build`]: LibraryBuilder::build
pub struct LibraryBuilder {
    name: String,
    config_schema: Vec<(String, ConfigSpec)>,
    services: Vec<(String, ServiceFactory)>,
    priority_init: Vec<String>,
    depends: Vec<Arc<LibraryDefinition>>,
}

impl LibraryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_schema: Vec::new(),
            services: Vec::new(),
            priority_init: Vec::new(),
            depends: Vec::new(),
        }
    }

    pub fn config(mut self, key: impl Into<String>, spec: ConfigSpec) -> Self {
        self.config_schema.push((key.into(), spec));
        self
    }

    pub fn service(mut self, name: impl Into<String>, factory: ServiceFactory) -> Self {
        self.services.push((name.into(), factory));
        self
    }

    /// Convenience for [`service`] with a plain async function.
    ///
    /// [`service`]: LibraryBuilder::service
    pub fn service_fn<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ServiceParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FactoryResult> + Send + 'static,
    {
        self.service(name, service_factory(f))
    }

    /// Services constructed first, in the given order; the remainder follow
    /// in declaration order.
    pub fn priority_init<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority_init = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on(mut self, library: &Arc<LibraryDefinition>) -> Self {
        self.depends.push(library.clone());
        self
    }

    pub fn build(self) -> Result<Arc<LibraryDefinition>, RegistryError> {
        validate_module(&self.name, &self.services, &self.priority_init)?;
        let lifecycle = ModuleLifecycle::new(self.name.clone());
        Ok(Arc::new(LibraryDefinition {
            name: self.name,
            config_schema: self.config_schema,
            services: self.services,
            priority_init: self.priority_init,
            depends: self.depends,
            lifecycle,
            config_binding: Mutex::new(None),
        }))
    }
}

struct ApplicationInner {
    name: String,
    config_schema: Vec<(String, ConfigSpec)>,
    services: Vec<(String, ServiceFactory)>,
    priority_init: Vec<String>,
    libraries: Vec<Arc<LibraryDefinition>>,
    booted: AtomicBool,
    lifecycle: ModuleLifecycle,
    config_binding: Mutex<Option<ConfigManager>>,
}

/// An application: the root module, composed of libraries. Cheap to clone;
/// clones share the definition and its booted state.
#[derive(Clone)]
pub struct ApplicationDefinition {
    inner: Arc<ApplicationInner>,
}

impl std::fmt::Debug for ApplicationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationDefinition")
            .field("name", &self.inner.name)
            .field(
                "libraries",
                &self.inner.libraries.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .field("booted", &self.is_booted())
            .finish()
    }
}

impl ApplicationDefinition {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config_schema(&self) -> &[(String, ConfigSpec)] {
        &self.inner.config_schema
    }

    pub fn services(&self) -> &[(String, ServiceFactory)] {
        &self.inner.services
    }

    pub fn priority_init(&self) -> &[String] {
        &self.inner.priority_init
    }

    pub fn libraries(&self) -> &[Arc<LibraryDefinition>] {
        &self.inner.libraries
    }

    pub fn lifecycle(&self) -> &ModuleLifecycle {
        &self.inner.lifecycle
    }

    pub fn is_booted(&self) -> bool {
        self.inner.booted.load(Ordering::SeqCst)
    }

    pub(crate) fn set_booted(&self, booted: bool) {
        self.inner.booted.store(booted, Ordering::SeqCst);
    }

    pub fn get_config(&self, key: &str) -> crate::kernel::error::Result<ConfigValue> {
        let binding = self
            .inner
            .config_binding
            .lock()
            .expect("config binding poisoned");
        match &*binding {
            Some(manager) => Ok(manager.get(&self.inner.name, key)?),
            None => Err(RegistryError::NotMounted {
                module: self.inner.name.clone(),
            }
            .into()),
        }
    }

    pub(crate) fn bind_config(&self, manager: &ConfigManager) {
        *self
            .inner
            .config_binding
            .lock()
            .expect("config binding poisoned") = Some(manager.clone());
    }

    pub(crate) fn unbind_config(&self) {
        *self
            .inner
            .config_binding
            .lock()
            .expect("config binding poisoned") = None;
    }
}

/// Builder for [`ApplicationDefinition`].
pub struct ApplicationBuilder {
    name: String,
    config_schema: Vec<(String, ConfigSpec)>,
    services: Vec<(String, ServiceFactory)>,
    priority_init: Vec<String>,
    libraries: Vec<Arc<LibraryDefinition>>,
}

impl ApplicationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_schema: Vec::new(),
            services: Vec::new(),
            priority_init: Vec::new(),
            libraries: Vec::new(),
        }
    }

    pub fn config(mut self, key: impl Into<String>, spec: ConfigSpec) -> Self {
        self.config_schema.push((key.into(), spec));
        self
    }

    pub fn service(mut self, name: impl Into<String>, factory: ServiceFactory) -> Self {
        self.services.push((name.into(), factory));
        self
    }

    pub fn service_fn<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ServiceParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FactoryResult> + Send + 'static,
    {
        self.service(name, service_factory(f))
    }

    pub fn priority_init<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority_init = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn library(mut self, library: &Arc<LibraryDefinition>) -> Self {
        self.libraries.push(library.clone());
        self
    }

    pub fn build(self) -> Result<ApplicationDefinition, RegistryError> {
        validate_module(&self.name, &self.services, &self.priority_init)?;
        let lifecycle = ModuleLifecycle::new(self.name.clone());
        Ok(ApplicationDefinition {
            inner: Arc::new(ApplicationInner {
                name: self.name,
                config_schema: self.config_schema,
                services: self.services,
                priority_init: self.priority_init,
                libraries: self.libraries,
                booted: AtomicBool::new(false),
                lifecycle,
                config_binding: Mutex::new(None),
            }),
        })
    }
}

/// Shared construction-time validation for libraries and applications.
fn validate_module(
    name: &str,
    services: &[(String, ServiceFactory)],
    priority_init: &[String],
) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::MissingLibraryName);
    }

    let mut seen = std::collections::HashSet::new();
    for (service, _) in services {
        if service.trim().is_empty() {
            return Err(RegistryError::InvalidServiceDefinition {
                module: name.to_string(),
                message: "service name must not be empty".to_string(),
            });
        }
        if !seen.insert(service.clone()) {
            return Err(RegistryError::DuplicateService {
                module: name.to_string(),
                service: service.clone(),
            });
        }
    }

    let mut priority_seen = std::collections::HashSet::new();
    for service in priority_init {
        if !seen.contains(service) {
            return Err(RegistryError::InvalidServiceDefinition {
                module: name.to_string(),
                message: format!("priority entry '{}' names no declared service", service),
            });
        }
        if !priority_seen.insert(service.clone()) {
            return Err(RegistryError::DoublePriority {
                module: name.to_string(),
                service: service.clone(),
            });
        }
    }
    Ok(())
}
