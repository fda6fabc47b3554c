//! Dotenv preload.
//!
//! Runs before the loaders so dotenv values are visible to the environment
//! loader. The file is resolved from, in order: the `--env-file` switch, the
//! bootstrap option, then `./.env`. A missing file is a warning, never an
//! error, and values never shadow variables already present in the snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::loader::CliSwitches;
use crate::kernel::constants::{DEFAULT_ENV_FILE, ENV_FILE_SWITCH};

/// Apply the resolved dotenv file to the environment snapshot.
pub fn preload(
    env: &mut BTreeMap<String, String>,
    switches: &CliSwitches,
    option_path: Option<&Path>,
    cwd: &Path,
) {
    let path: PathBuf = switches
        .find(ENV_FILE_SWITCH)
        .map(PathBuf::from)
        .or_else(|| option_path.map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.join(DEFAULT_ENV_FILE));

    if !path.is_file() {
        log::warn!("dotenv file {} not found, continuing without it", path.display());
        return;
    }

    let iter = match dotenvy::from_path_iter(&path) {
        Ok(iter) => iter,
        Err(e) => {
            log::warn!("failed to read dotenv file {}: {}", path.display(), e);
            return;
        }
    };

    let mut loaded = 0usize;
    for item in iter {
        match item {
            Ok((key, value)) => {
                // Real environment wins over dotenv, per dotenv convention.
                if !env.contains_key(&key) {
                    env.insert(key, value);
                    loaded += 1;
                }
            }
            Err(e) => log::warn!("skipping malformed dotenv entry in {}: {}", path.display(), e),
        }
    }
    log::debug!("dotenv preload from {}: {} values", path.display(), loaded);
}
