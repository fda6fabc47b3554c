//! Load-order planning.
//!
//! Libraries are ordered so every library mounts after all of its declared
//! dependencies; services within a module are ordered by the priority list
//! with the remainder following in declaration order.

use std::collections::HashSet;
use std::sync::Arc;

use crate::registry::definition::{ApplicationDefinition, LibraryDefinition, ServiceFactory};
use crate::registry::error::RegistryError;

/// Order an application's libraries dependency-first.
///
/// Iteratively picks the first library (in declaration order) whose
/// unresolved dependencies are all placed. A pass that places nothing means
/// a cycle; the error names the libraries already placed so the remainder is
/// easy to inspect.
///
/// Dependencies are resolved by name within the application. A dependency
/// reference that is not the identical definition the application carries
/// logs a warning and the application's reference wins; composing libraries
/// from multiple sources is allowed.
pub fn order_libraries(
    app: &ApplicationDefinition,
) -> Result<Vec<Arc<LibraryDefinition>>, RegistryError> {
    let libraries = app.libraries();

    // Resolve each library's dependency names against the application set.
    let mut dep_names: Vec<(String, Vec<String>)> = Vec::with_capacity(libraries.len());
    for library in libraries {
        let mut names = Vec::new();
        for dep in library.depends() {
            let owned = libraries.iter().find(|l| l.name() == dep.name());
            match owned {
                None => {
                    return Err(RegistryError::MissingDependency {
                        application: app.name().to_string(),
                        library: library.name().to_string(),
                        dependency: dep.name().to_string(),
                    });
                }
                Some(owned) => {
                    if !Arc::ptr_eq(owned, dep) {
                        log::warn!(
                            "library '{}' depends on a different copy of '{}' than the application provides; using the application's",
                            library.name(),
                            dep.name()
                        );
                    }
                    names.push(owned.name().to_string());
                }
            }
        }
        dep_names.push((library.name().to_string(), names));
    }

    let mut placed: Vec<Arc<LibraryDefinition>> = Vec::with_capacity(libraries.len());
    let mut placed_names: HashSet<String> = HashSet::new();
    let mut remaining: Vec<usize> = (0..libraries.len()).collect();

    while !remaining.is_empty() {
        let position = remaining.iter().position(|&i| {
            dep_names[i]
                .1
                .iter()
                .all(|dep| placed_names.contains(dep))
        });
        match position {
            Some(position) => {
                let index = remaining.remove(position);
                placed_names.insert(libraries[index].name().to_string());
                placed.push(libraries[index].clone());
            }
            None => {
                return Err(RegistryError::BadSort {
                    placed: placed.iter().map(|l| l.name().to_string()).collect(),
                });
            }
        }
    }
    Ok(placed)
}

/// Service construction order within a module: the priority list first, the
/// remaining services after in declaration order.
pub fn wire_order(
    module: &str,
    priority_init: &[String],
    services: &[(String, ServiceFactory)],
) -> Result<Vec<String>, RegistryError> {
    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(services.len());
    for service in priority_init {
        if !seen.insert(service.clone()) {
            return Err(RegistryError::DoublePriority {
                module: module.to_string(),
                service: service.clone(),
            });
        }
        order.push(service.clone());
    }
    for (service, _) in services {
        if seen.insert(service.clone()) {
            order.push(service.clone());
        }
    }
    Ok(order)
}
