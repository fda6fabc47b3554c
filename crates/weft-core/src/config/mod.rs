//! Configuration subsystem.
//!
//! Modules declare typed schemas; the manager owns the resolved tree and
//! dispatches update watchers; loaders overlay values from files, the
//! environment, CLI switches and a dotenv preload in a fixed precedence
//! order (bootstrap override > CLI > env > file > default).

pub mod error;
pub mod loader;
pub mod manager;
pub mod schema;

pub use error::ConfigError;
pub use loader::{CliSwitches, LoaderContext};
pub use manager::{ConfigManager, ConfigUpdate};
pub use schema::{coerce_json, parse_config, ConfigKind, ConfigSpec, ConfigValue};

#[cfg(test)]
mod tests;
