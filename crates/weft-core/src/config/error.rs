use thiserror::Error;

use crate::config::schema::ConfigKind;

/// Errors raised by the configuration manager and its loaders.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown config key '{module}.{key}'")]
    UnknownKey { module: String, key: String },

    #[error("unknown config module '{0}'")]
    UnknownModule(String),

    /// The key is declared but no source has supplied a value.
    #[error("config key '{module}.{key}' has no value")]
    Unset { module: String, key: String },

    /// Whole-module assignment is forbidden; values are written per key.
    #[error("cannot assign a whole object for module '{module}'; set individual keys")]
    NonLeafWrite { module: String },

    #[error("type mismatch for '{module}.{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        module: String,
        key: String,
        expected: ConfigKind,
        actual: ConfigKind,
    },

    /// One or more `required` specs resolved to no value after every loader ran.
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("config module '{0}' is already registered")]
    ModuleAlreadyRegistered(String),

    /// Schema registration attempted after the loaders already ran.
    #[error("cannot register schema for module '{module}' after configuration was loaded")]
    LateConfigure { module: String },
}

impl ConfigError {
    /// Stable string code for log filtering.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::UnknownKey { .. } => "UnknownConfigKey",
            ConfigError::UnknownModule(_) => "UnknownConfigModule",
            ConfigError::Unset { .. } => "UnsetConfigValue",
            ConfigError::NonLeafWrite { .. } => "NonLeafConfigWrite",
            ConfigError::TypeMismatch { .. } => "ConfigTypeMismatch",
            ConfigError::MissingRequired(_) => "MissingRequiredConfig",
            ConfigError::ModuleAlreadyRegistered(_) => "DuplicateModule",
            ConfigError::LateConfigure { .. } => "LateConfigure",
        }
    }
}
