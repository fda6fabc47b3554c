//! Module definitions and load-order planning.
//!
//! A module is either a library or the application itself: a named config
//! schema plus a set of service factories, with an optional priority list
//! steering construction order. Definitions validate on build and stay pure
//! data until bootstrap mounts them.

pub mod definition;
pub mod error;
pub mod planner;

pub use definition::{
    service_factory, ApplicationBuilder, ApplicationDefinition, FactoryResult, LibraryBuilder,
    LibraryDefinition, ServiceApi, ServiceFactory,
};
pub use error::RegistryError;
pub use planner::{order_libraries, wire_order};

#[cfg(test)]
mod tests;
