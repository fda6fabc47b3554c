//! Staged application lifecycle.
//!
//! The kernel drives every module through an ordered sequence of stages.
//! Callbacks attach per module and per stage, carry an optional integer
//! priority (lower runs earlier; unprioritised callbacks run after all
//! prioritised ones, concurrently with each other), and run exactly once.
//! The built-in boilerplate module always completes a stage before any
//! other module starts it.

pub mod engine;
pub mod error;
pub mod handle;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub use engine::LifecycleEngine;
pub use error::LifecycleError;
pub use handle::ModuleLifecycle;

/// The lifecycle stages, in execution order.
///
/// `PreShutdown` is the quiesce point for schedulers and other resource
/// holders; it always runs strictly before `ShutdownStart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    PreInit,
    PostConfig,
    Bootstrap,
    Ready,
    PreShutdown,
    ShutdownStart,
    ShutdownComplete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PreInit => "PreInit",
            Stage::PostConfig => "PostConfig",
            Stage::Bootstrap => "Bootstrap",
            Stage::Ready => "Ready",
            Stage::PreShutdown => "PreShutdown",
            Stage::ShutdownStart => "ShutdownStart",
            Stage::ShutdownComplete => "ShutdownComplete",
        }
    }

    /// Shutdown-side stages refuse late attaches instead of deferring them.
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            Stage::PreShutdown | Stage::ShutdownStart | Stage::ShutdownComplete
        )
    }

    /// Callback failures in these stages abort bootstrap; later failures are
    /// logged and swallowed.
    pub(crate) fn aborts_on_failure(&self) -> bool {
        matches!(self, Stage::PreInit | Stage::PostConfig | Stage::Bootstrap)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for lifecycle callbacks.
pub type CallbackResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Owned future produced by a lifecycle callback.
pub type CallbackFuture = Pin<Box<dyn Future<Output = CallbackResult> + Send + 'static>>;

/// A one-shot lifecycle callback.
pub type StageCallback = Box<dyn FnOnce() -> CallbackFuture + Send>;

#[cfg(test)]
mod tests;
