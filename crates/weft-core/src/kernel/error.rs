use std::error::Error as StdError;
use std::fmt;
use std::result::Result as StdResult;

use crate::config::error::ConfigError;
use crate::container::error::ContainerError;
use crate::lifecycle::error::LifecycleError;
use crate::registry::error::RegistryError;
use crate::scheduler::error::SchedulerError;

/// Top-level error type for the weft kernel.
///
/// Subsystems define their own error enums; this type wraps them and adds the
/// boot-slot errors that belong to the kernel itself. Every variant maps to a
/// stable string via [`Error::code`] so failures can be grepped out of logs.
#[derive(Debug)]
pub enum Error {
    /// Construction- or plan-time registry error
    Registry(RegistryError),
    /// Lifecycle engine error
    Lifecycle(LifecycleError),
    /// Configuration error
    Config(ConfigError),
    /// Scheduler error
    Scheduler(SchedulerError),
    /// Service container error
    Container(ContainerError),
    /// Another application is already active in this process
    NoDualBoot { active: String, requested: String },
    /// `bootstrap()` called twice on the same application without a teardown
    DoubleBoot { application: String },
    /// Generic error with message
    Other(String),
}

/// Shorthand for Result with the kernel error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Stable string code for this error, suitable for log filtering.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Registry(e) => e.code(),
            Error::Lifecycle(e) => e.code(),
            Error::Config(e) => e.code(),
            Error::Scheduler(e) => e.code(),
            Error::Container(e) => e.code(),
            Error::NoDualBoot { .. } => "NoDualBoot",
            Error::DoubleBoot { .. } => "DoubleBoot",
            Error::Other(_) => "Other",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Lifecycle(e) => write!(f, "Lifecycle error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Scheduler(e) => write!(f, "Scheduler error: {}", e),
            Error::Container(e) => write!(f, "Container error: {}", e),
            Error::NoDualBoot { active, requested } => write!(
                f,
                "Cannot bootstrap '{}': application '{}' is already active in this process",
                requested, active
            ),
            Error::DoubleBoot { application } => write!(
                f,
                "Application '{}' is already booted; call teardown() before bootstrapping again",
                application
            ),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Registry(e) => Some(e),
            Error::Lifecycle(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Scheduler(e) => Some(e),
            Error::Container(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<LifecycleError> for Error {
    fn from(e: LifecycleError) -> Self {
        Error::Lifecycle(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<SchedulerError> for Error {
    fn from(e: SchedulerError) -> Self {
        Error::Scheduler(e)
    }
}

impl From<ContainerError> for Error {
    fn from(e: ContainerError) -> Self {
        Error::Container(e)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
