//! Environment variable loader.
//!
//! For each declared `(module, key)` the loader searches the env snapshot
//! for `<module>_<key>` and bare `<key>`, exact spellings first, then the
//! relaxed form where case is ignored and `_`/`-` are interchangeable. The
//! first match wins.

use crate::config::loader::{lookup_entry, LoaderContext};
use crate::config::manager::ConfigManager;
use crate::config::schema::{parse_config, ConfigValue};

pub fn load(
    manager: &ConfigManager,
    ctx: &LoaderContext,
) -> Vec<(String, String, ConfigValue)> {
    // BTreeMap iteration gives a stable scan order for relaxed matches.
    let entries: Vec<(String, String)> = ctx
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut out = Vec::new();
    for (module, key, spec) in manager.schema_entries() {
        if let Some(raw) = lookup_entry(&entries, &module, &key) {
            out.push((module, key, parse_config(&spec, raw)));
        }
    }
    out
}
