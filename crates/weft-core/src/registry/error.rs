use thiserror::Error;

/// Construction- and plan-time errors for module definitions.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("library name must not be empty")]
    MissingLibraryName,

    #[error("invalid service definition in module '{module}': {message}")]
    InvalidServiceDefinition { module: String, message: String },

    #[error("duplicate service '{service}' in module '{module}'")]
    DuplicateService { module: String, service: String },

    #[error("duplicate priority entry '{service}' in module '{module}'")]
    DoublePriority { module: String, service: String },

    #[error("library '{library}' depends on '{dependency}', which is not part of application '{application}'")]
    MissingDependency {
        application: String,
        library: String,
        dependency: String,
    },

    /// Library ordering made no progress; names the libraries already placed
    /// so the cycle is easy to locate.
    #[error("cannot order libraries; placed so far: [{}]", .placed.join(", "))]
    BadSort { placed: Vec<String> },

    /// A definition API that needs a running kernel was called while the
    /// module is not mounted.
    #[error("module '{module}' is not mounted")]
    NotMounted { module: String },
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::MissingLibraryName => "MissingLibraryName",
            RegistryError::InvalidServiceDefinition { .. } => "InvalidServiceDefinition",
            RegistryError::DuplicateService { .. } => "DuplicateService",
            RegistryError::DoublePriority { .. } => "DoublePriority",
            RegistryError::MissingDependency { .. } => "MissingDependency",
            RegistryError::BadSort { .. } => "BadSort",
            RegistryError::NotMounted { .. } => "NotMounted",
        }
    }
}
