use thiserror::Error;

use crate::lifecycle::Stage;

/// Errors raised by the lifecycle engine.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A user callback failed during a stage that aborts on failure.
    #[error("callback failed during {stage} for module '{module}': {message}")]
    UserCallbackFailure {
        stage: Stage,
        module: String,
        message: String,
    },
}

impl LifecycleError {
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::UserCallbackFailure { .. } => "UserCallbackFailure",
        }
    }
}
