//! Typed configuration schemas and value coercion.
//!
//! Each module declares a mapping of config keys to [`ConfigSpec`]s. The
//! loaders produce raw strings (environment, CLI switches) or loosely typed
//! values (config files); [`parse_config`] and [`coerce_json`] turn those
//! into [`ConfigValue`]s matching the declared kind.

use std::fmt;

use serde::Serialize;

/// The declared type of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    String,
    Number,
    Boolean,
    StringList,
    Record,
    /// Framework-internal values; stored as records, never surfaced in docs.
    Internal,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigKind::String => "string",
            ConfigKind::Number => "number",
            ConfigKind::Boolean => "boolean",
            ConfigKind::StringList => "string[]",
            ConfigKind::Record => "record",
            ConfigKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A resolved configuration value.
///
/// Numbers are `f64`; a failed numeric parse yields `NaN` rather than an
/// error, so `Number` equality has the usual `NaN != NaN` caveat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Number(f64),
    Boolean(bool),
    StringList(Vec<String>),
    Record(serde_json::Value),
}

impl ConfigValue {
    /// The kind this value belongs to. `Record` is reported for both
    /// `record` and `internal` specs.
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::String(_) => ConfigKind::String,
            ConfigValue::Number(_) => ConfigKind::Number,
            ConfigValue::Boolean(_) => ConfigKind::Boolean,
            ConfigValue::StringList(_) => ConfigKind::StringList,
            ConfigValue::Record(_) => ConfigKind::Record,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            ConfigValue::StringList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&serde_json::Value> {
        match self {
            ConfigValue::Record(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<f64> for ConfigValue {
    fn from(n: f64) -> Self {
        ConfigValue::Number(n)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Number(n as f64)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(list: Vec<String>) -> Self {
        ConfigValue::StringList(list)
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(v: serde_json::Value) -> Self {
        ConfigValue::Record(v)
    }
}

/// Declaration of a single configuration key. Serializable so module
/// schemas can be dumped for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSpec {
    pub kind: ConfigKind,
    pub default: Option<ConfigValue>,
    /// Allowed values for string specs. Advisory only: preserved for
    /// introspection, not enforced.
    pub enum_values: Option<Vec<String>>,
    /// If true and no loader supplies a value, bootstrap fails.
    pub required: bool,
    pub description: String,
}

impl ConfigSpec {
    fn new(kind: ConfigKind) -> Self {
        Self {
            kind,
            default: None,
            enum_values: None,
            required: false,
            description: String::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(ConfigKind::String)
    }

    pub fn number() -> Self {
        Self::new(ConfigKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(ConfigKind::Boolean)
    }

    pub fn string_list() -> Self {
        Self::new(ConfigKind::StringList)
    }

    pub fn record() -> Self {
        Self::new(ConfigKind::Record)
    }

    pub fn internal() -> Self {
        Self::new(ConfigKind::Internal)
    }

    pub fn with_default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether a value of the given kind satisfies this spec.
    pub fn accepts(&self, kind: ConfigKind) -> bool {
        match self.kind {
            ConfigKind::Record | ConfigKind::Internal => kind == ConfigKind::Record,
            declared => declared == kind,
        }
    }
}

/// Coerce a raw string into a value of the spec's kind.
///
/// Total over strings: no input causes an error. Numeric parse failures yield
/// `NaN`; unrecognised boolean spellings yield `false`; invalid JSON for list
/// and record kinds keeps the raw string (a one-element list, or a JSON
/// string value). Already-typed inputs pass through [`coerce_json`] untouched.
pub fn parse_config(spec: &ConfigSpec, raw: &str) -> ConfigValue {
    match spec.kind {
        ConfigKind::String => ConfigValue::String(raw.to_string()),
        ConfigKind::Number => ConfigValue::Number(raw.trim().parse::<f64>().unwrap_or(f64::NAN)),
        ConfigKind::Boolean => ConfigValue::Boolean(parse_boolean(raw)),
        ConfigKind::StringList => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Array(items)) => {
                ConfigValue::StringList(items.into_iter().map(stringify).collect())
            }
            _ => ConfigValue::StringList(vec![raw.to_string()]),
        },
        ConfigKind::Record | ConfigKind::Internal => match serde_json::from_str(raw) {
            Ok(value) => ConfigValue::Record(value),
            Err(_) => ConfigValue::Record(serde_json::Value::String(raw.to_string())),
        },
    }
}

/// Truthy spellings accepted for boolean specs. Anything unrecognised is
/// `false`, matching long-standing loader behaviour.
fn parse_boolean(raw: &str) -> bool {
    let folded = raw.trim().to_ascii_lowercase();
    match folded.as_str() {
        "true" | "y" | "1" | "on" => true,
        "false" | "n" | "0" | "off" => false,
        other => {
            log::debug!("unrecognised boolean spelling '{}', coercing to false", other);
            false
        }
    }
}

fn stringify(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Coerce a loosely typed file value into the spec's kind.
///
/// Strings go through [`parse_config`]; structured values are converted
/// directly. Returns `None` (with a warning) when the shapes are
/// irreconcilable, so a bad file entry is skipped rather than fatal.
pub fn coerce_json(spec: &ConfigSpec, value: serde_json::Value) -> Option<ConfigValue> {
    use serde_json::Value;

    match (&spec.kind, value) {
        // Null means "key present, no value"; nothing to coerce.
        (ConfigKind::Record | ConfigKind::Internal, Value::Null) => {
            Some(ConfigValue::Record(Value::Null))
        }
        (_, Value::Null) => None,
        (_, Value::String(s)) => Some(parse_config(spec, &s)),
        (ConfigKind::String, other) => Some(ConfigValue::String(stringify(other))),
        (ConfigKind::Number, Value::Number(n)) => {
            Some(ConfigValue::Number(n.as_f64().unwrap_or(f64::NAN)))
        }
        (ConfigKind::Boolean, Value::Bool(b)) => Some(ConfigValue::Boolean(b)),
        (ConfigKind::StringList, Value::Array(items)) => Some(ConfigValue::StringList(
            items.into_iter().map(stringify).collect(),
        )),
        (ConfigKind::Record | ConfigKind::Internal, other) => Some(ConfigValue::Record(other)),
        (kind, other) => {
            log::warn!(
                "cannot coerce file value {} into a {} config entry; skipping",
                other,
                kind
            );
            None
        }
    }
}

/// Coerce an already-typed value into the spec's kind.
///
/// Idempotent on matching kinds; strings are re-parsed; anything else is
/// rejected with the mismatching kind for the caller's error report.
pub fn coerce_value(spec: &ConfigSpec, value: ConfigValue) -> Result<ConfigValue, ConfigKind> {
    if spec.accepts(value.kind()) {
        return Ok(value);
    }
    match value {
        ConfigValue::String(raw) => Ok(parse_config(spec, &raw)),
        other => Err(other.kind()),
    }
}
