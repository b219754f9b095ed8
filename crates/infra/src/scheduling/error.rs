//! Scheduler error types

use stride_domain::StrideError;
use thiserror::Error;

/// Errors produced by the schedulers
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,

    #[error("Scheduled job timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Scheduler task failed to join: {0}")]
    TaskJoinFailed(String),
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl From<SchedulerError> for StrideError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                StrideError::InvalidInput(err.to_string())
            }
            other => StrideError::Scheduling(other.to_string()),
        }
    }
}
