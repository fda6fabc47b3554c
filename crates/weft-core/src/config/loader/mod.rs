//! Configuration loaders.
//!
//! Sources are applied in a fixed precedence order, later sources
//! overriding earlier ones per key:
//!
//! 1. schema defaults (seeded at registration)
//! 2. configuration files (candidate search or `--CONFIG` override)
//! 3. environment variables
//! 4. CLI switches
//!
//! A bootstrap-supplied partial is merged after all of these by the kernel.

pub mod cli;
pub mod dotenv;
pub mod env;
pub mod file;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::manager::ConfigManager;
use crate::config::schema::ConfigValue;

pub use cli::CliSwitches;

/// Everything a loader needs to resolve values, captured once at bootstrap.
///
/// The environment is a snapshot (optionally extended by a dotenv preload)
/// rather than live process state, which keeps loader runs deterministic and
/// testable.
#[derive(Debug, Clone)]
pub struct LoaderContext {
    /// Module name the application's own keys resolve under; also the `<app>`
    /// component of the file search paths.
    pub app_module: String,
    /// Environment snapshot, including dotenv-preloaded values.
    pub env: BTreeMap<String, String>,
    /// Parsed command-line switches.
    pub switches: CliSwitches,
    /// Working directory for the `<cwd>/.<app>` candidate.
    pub cwd: PathBuf,
    /// Root for system-wide candidates; `/etc` outside of tests.
    pub etc_root: PathBuf,
}

impl LoaderContext {
    /// Home directory, taken from the env snapshot so tests can steer it.
    pub fn home(&self) -> Option<PathBuf> {
        self.env.get("HOME").map(PathBuf::from)
    }
}

/// Run every loader in precedence order and fold the results into the
/// manager. Individual bad entries are skipped with a warning; loaders never
/// abort bootstrap.
pub fn run_loaders(manager: &ConfigManager, ctx: &LoaderContext) {
    let mut passes: Vec<(&str, Vec<(String, String, ConfigValue)>)> = vec![
        ("file", file::load(manager, ctx)),
        ("env", env::load(manager, ctx)),
        ("cli", cli::load(manager, ctx)),
    ];
    for (source, values) in passes.drain(..) {
        for (module, key, value) in values {
            if let Err(e) = manager.apply_loaded(&module, &key, value) {
                log::warn!("{} loader: ignoring '{}.{}': {}", source, module, key, e);
            }
        }
    }
}

/// Fold a name for relaxed comparison: case-insensitive, with `-` and `_`
/// treated as the same character.
pub(crate) fn fold_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "_")
}

/// Look up a `(module, key)` pair in a list of `(name, value)` entries.
///
/// Candidate names are tried in order: exact `<module>_<key>`, exact bare
/// `<key>`, then the relaxed spelling of each. The first match wins; the
/// entry list is scanned in the order given.
pub(crate) fn lookup_entry<'a>(
    entries: &'a [(String, String)],
    module: &str,
    key: &str,
) -> Option<&'a str> {
    let qualified = format!("{}_{}", module, key);
    for candidate in [qualified.as_str(), key] {
        if let Some((_, value)) = entries.iter().find(|(name, _)| name == candidate) {
            return Some(value);
        }
    }
    for candidate in [qualified.as_str(), key] {
        let folded = fold_name(candidate);
        if let Some((_, value)) = entries.iter().find(|(name, _)| fold_name(name) == folded) {
            return Some(value);
        }
    }
    None
}
