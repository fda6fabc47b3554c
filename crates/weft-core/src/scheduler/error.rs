use thiserror::Error;

/// Errors raised while registering scheduled jobs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expression}': {message}")]
    InvalidCronExpression { expression: String, message: String },
}

impl SchedulerError {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::InvalidCronExpression { .. } => "InvalidCronExpression",
        }
    }
}
