//! CLI switch loader.
//!
//! Consumes `--KEY value` and `--KEY=value` pairs from the argv the kernel
//! was handed. Name matching follows the environment loader's rules; CLI
//! values override environment values, which override file values.

use crate::config::loader::{lookup_entry, LoaderContext};
use crate::config::manager::ConfigManager;
use crate::config::schema::{parse_config, ConfigValue};

/// Parsed command-line switches, in argv order.
#[derive(Debug, Clone, Default)]
pub struct CliSwitches {
    pairs: Vec<(String, String)>,
}

impl CliSwitches {
    /// Parse switches out of an argv slice. The first element is assumed to
    /// be the program name and skipped. A switch without a following value
    /// (or followed by another switch) reads as the bare flag value `"true"`.
    pub fn parse(argv: &[String]) -> Self {
        let mut pairs = Vec::new();
        let mut args = argv.iter().skip(1).peekable();
        while let Some(token) = args.next() {
            let Some(name) = token.strip_prefix("--") else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if let Some((name, value)) = name.split_once('=') {
                pairs.push((name.to_string(), value.to_string()));
            } else if let Some(next) = args.peek() {
                if next.starts_with("--") {
                    pairs.push((name.to_string(), "true".to_string()));
                } else {
                    pairs.push((name.to_string(), args.next().cloned().unwrap_or_default()));
                }
            } else {
                pairs.push((name.to_string(), "true".to_string()));
            }
        }
        Self { pairs }
    }

    /// Relaxed lookup of a single switch by name. When a switch is repeated,
    /// the last occurrence wins. Exact spellings take precedence over
    /// relaxed ones.
    pub fn find(&self, name: &str) -> Option<&str> {
        if let Some((_, value)) = self.pairs.iter().rev().find(|(n, _)| n == name) {
            return Some(value);
        }
        let folded = crate::config::loader::fold_name(name);
        self.pairs
            .iter()
            .rev()
            .find(|(candidate, _)| crate::config::loader::fold_name(candidate) == folded)
            .map(|(_, value)| value.as_str())
    }

    /// All pairs, most recent first, for the `(module, key)` matcher.
    fn reversed(&self) -> Vec<(String, String)> {
        self.pairs.iter().rev().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Resolve every declared `(module, key)` against the parsed switches.
pub fn load(
    manager: &ConfigManager,
    ctx: &LoaderContext,
) -> Vec<(String, String, ConfigValue)> {
    let entries = ctx.switches.reversed();
    let mut out = Vec::new();
    for (module, key, spec) in manager.schema_entries() {
        if let Some(raw) = lookup_entry(&entries, &module, &key) {
            out.push((module, key, parse_config(&spec, raw)));
        }
    }
    out
}
