//! The service container: parameter bundles, wiring, and the built-in
//! boilerplate module.

pub mod boilerplate;
pub mod error;
pub mod params;
pub mod wiring;

pub use boilerplate::boilerplate_library;
pub use error::ContainerError;
pub use params::{ConfigView, Peers, ServiceParams};
pub use wiring::{ServiceContainer, WiringFacilities};

#[cfg(test)]
mod tests;
