//! Configuration file loader.
//!
//! Searches a fixed candidate list, merging every file found in list order
//! so later candidates override earlier ones per key. The `--CONFIG` switch
//! replaces the whole search with a single file. Encoding is chosen by
//! extension: `.json`, `.yaml`/`.yml`, and `.ini` (or no extension) for INI.
//!
//! Inside a file, a top-level table whose name resolves to a registered
//! module configures that module; every other top-level key configures the
//! application module. INI section headers map to modules, the sectionless
//! prologue to the application.

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::config::loader::LoaderContext;
use crate::config::manager::ConfigManager;
use crate::config::schema::{coerce_json, ConfigValue};
use crate::kernel::constants::CONFIG_FILE_KEY;

/// File formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
    Ini,
}

impl FileFormat {
    /// INI is the fallback for unknown or missing extensions.
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => FileFormat::Json,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            _ => FileFormat::Ini,
        }
    }
}

/// Raw entry lifted out of a file before schema resolution.
enum RawEntry {
    /// A key in a named section (`[section]` in INI, nested table in
    /// JSON/YAML). The section may turn out to be a module or a
    /// record-typed application key.
    Sectioned {
        section: String,
        key: String,
        value: serde_json::Value,
    },
    /// A top-level scalar belonging to the application module.
    Toplevel {
        key: String,
        value: serde_json::Value,
    },
}

pub fn load(
    manager: &ConfigManager,
    ctx: &LoaderContext,
) -> Vec<(String, String, ConfigValue)> {
    let files = match ctx.switches.find(CONFIG_FILE_KEY) {
        Some(override_path) => {
            let path = PathBuf::from(override_path);
            if path.is_file() {
                vec![path]
            } else {
                log::warn!("--CONFIG file {} not found", path.display());
                Vec::new()
            }
        }
        None => candidate_paths(ctx)
            .into_iter()
            .filter(|p| p.is_file())
            .collect(),
    };

    let mut out = Vec::new();
    for path in files {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("cannot read config file {}: {}", path.display(), e);
                continue;
            }
        };
        let entries = match parse_file(&content, FileFormat::from_path(&path)) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("skipping malformed config file {}: {}", path.display(), e);
                continue;
            }
        };
        log::debug!("loaded config file {}", path.display());
        resolve_entries(manager, ctx, entries, &mut out);
    }
    out
}

/// The documented search list, in ascending precedence order.
fn candidate_paths(ctx: &LoaderContext) -> Vec<PathBuf> {
    let app = &ctx.app_module;
    let mut bases = vec![
        ctx.etc_root.join(app).join("config"),
        ctx.etc_root.join(app),
        ctx.cwd.join(format!(".{}", app)),
    ];
    if let Some(home) = ctx.home() {
        bases.push(home.join(".config").join(app));
        bases.push(home.join(".config").join(app).join("config"));
    }

    let mut candidates = Vec::new();
    for base in bases {
        for ext in ["", ".ini", ".json", ".yaml", ".yml"] {
            if ext.is_empty() {
                candidates.push(base.clone());
            } else {
                let mut with_ext = base.clone().into_os_string();
                with_ext.push(ext);
                candidates.push(PathBuf::from(with_ext));
            }
        }
    }
    candidates
}

fn parse_file(content: &str, format: FileFormat) -> Result<Vec<RawEntry>, String> {
    match format {
        FileFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_str(content).map_err(|e| e.to_string())?;
            Ok(split_document(value))
        }
        FileFormat::Yaml => {
            let value: serde_json::Value =
                serde_yaml::from_str(content).map_err(|e| e.to_string())?;
            Ok(split_document(value))
        }
        FileFormat::Ini => {
            let ini = Ini::load_from_str(content).map_err(|e| e.to_string())?;
            let mut entries = Vec::new();
            for (section, properties) in ini.iter() {
                for (key, value) in properties.iter() {
                    let value = serde_json::Value::String(value.to_string());
                    entries.push(match section {
                        Some(section) => RawEntry::Sectioned {
                            section: section.to_string(),
                            key: key.to_string(),
                            value,
                        },
                        None => RawEntry::Toplevel {
                            key: key.to_string(),
                            value,
                        },
                    });
                }
            }
            Ok(entries)
        }
    }
}

/// Split a parsed JSON/YAML document into raw entries. Nested tables become
/// sections; scalars stay with the application module.
fn split_document(value: serde_json::Value) -> Vec<RawEntry> {
    let serde_json::Value::Object(map) = value else {
        return Vec::new();
    };
    let mut entries = Vec::new();
    for (name, value) in map {
        match value {
            serde_json::Value::Object(section) => {
                for (key, value) in section {
                    entries.push(RawEntry::Sectioned {
                        section: name.clone(),
                        key,
                        value,
                    });
                }
            }
            scalar => entries.push(RawEntry::Toplevel { key: name, value: scalar }),
        }
    }
    entries
}

/// Resolve raw entries against the registered schemas, coercing values to
/// their declared kind. Unknown modules and keys are quietly skipped; config
/// files routinely carry sections for modules not present in this build.
fn resolve_entries(
    manager: &ConfigManager,
    ctx: &LoaderContext,
    entries: Vec<RawEntry>,
    out: &mut Vec<(String, String, ConfigValue)>,
) {
    // Sections that are really record-typed application keys are
    // reassembled here before coercion.
    let mut record_sections: std::collections::BTreeMap<String, serde_json::Map<String, serde_json::Value>> =
        std::collections::BTreeMap::new();

    for entry in entries {
        let (module, key, value) = match entry {
            RawEntry::Toplevel { key, value } => (ctx.app_module.clone(), key, value),
            RawEntry::Sectioned { section, key, value } => {
                match manager.resolve_module(&section) {
                    Some(module) => (module, key, value),
                    None if manager.spec(&ctx.app_module, &section).is_some() => {
                        record_sections.entry(section).or_default().insert(key, value);
                        continue;
                    }
                    None => {
                        log::debug!("config file section '{}' matches no module", section);
                        continue;
                    }
                }
            }
        };
        let Some(spec) = manager.spec(&module, &key) else {
            log::debug!("config file key '{}.{}' is not declared", module, key);
            continue;
        };
        if let Some(value) = coerce_json(&spec, value) {
            out.push((module, key, value));
        }
    }

    for (key, object) in record_sections {
        if let Some(spec) = manager.spec(&ctx.app_module, &key) {
            if let Some(value) = coerce_json(&spec, serde_json::Value::Object(object)) {
                out.push((ctx.app_module.clone(), key, value));
            }
        }
    }
}
