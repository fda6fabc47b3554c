use thiserror::Error;

/// Errors raised while wiring services.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("service '{service}' is already wired in module '{module}'")]
    DuplicateService { module: String, service: String },

    /// Wiring attempted after bootstrap sealed the container.
    #[error("cannot wire '{context}' after bootstrap completed")]
    LateServerRegister { context: String },

    /// A service factory failed. Wiring errors are not recoverable.
    #[error("service factory for '{context}' failed: {message}")]
    ServiceFactoryFailure { context: String, message: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::DuplicateService { .. } => "DuplicateService",
            ContainerError::LateServerRegister { .. } => "LateServerRegister",
            ContainerError::ServiceFactoryFailure { .. } => "ServiceFactoryFailure",
        }
    }
}
