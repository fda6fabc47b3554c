//! Context-tagged structured logging over the [`log`] facade.
//!
//! Every wired service receives a [`Logger`] pre-tagged with its
//! `<module>:<service>` context. The kernel reserves [`Logger::fatal`] for
//! unrecoverable wiring errors; everything else in user code should go
//! through the ordinary levels.

use std::fmt;
use std::str::FromStr;

/// Severity levels understood by the logger contract.
///
/// `Fatal` has no counterpart in the `log` facade and is emitted at error
/// severity with a `FATAL` marker so downstream filters can still isolate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }

    fn facade_level(&self) -> log::Level {
        match self {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error | LogLevel::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// A logger bound to a fixed context string.
///
/// The context becomes the log target, so `RUST_LOG=app:http=debug` style
/// filters work per service.
#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
}

impl Logger {
    /// Create a logger tagged with the given context.
    pub fn tagged(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// The context this logger is bound to.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Emit a record at an explicit level with optional structured fields.
    pub fn log(&self, level: LogLevel, fields: Option<&serde_json::Value>, message: &str) {
        let target: &str = &self.context;
        let marker = if level == LogLevel::Fatal { "FATAL " } else { "" };
        match fields {
            Some(fields) => log::log!(
                target: target,
                level.facade_level(),
                "{}{} {}",
                marker,
                message,
                fields
            ),
            None => log::log!(target: target, level.facade_level(), "{}{}", marker, message),
        }
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, None, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, None, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, None, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, None, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, None, message);
    }

    /// Fatal severity. Reserved by the kernel for unrecoverable wiring errors.
    pub fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, None, message);
    }
}
