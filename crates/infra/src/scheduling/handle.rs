//! Cancellable handles for spawned timer tasks

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::{SchedulerError, SchedulerResult};

/// What a scheduled task exists for; carried in logs and shutdown paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePurpose {
    PeriodicFlush,
    EndOfDayFlush,
    MotivationAlert,
}

impl std::fmt::Display for SchedulePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PeriodicFlush => write!(f, "periodic-flush"),
            Self::EndOfDayFlush => write!(f, "end-of-day-flush"),
            Self::MotivationAlert => write!(f, "motivation-alert"),
        }
    }
}

/// A running timer task plus the token that stops it.
///
/// Dropping the handle cancels the task; [`ScheduleHandle::shutdown`]
/// additionally joins it with a timeout.
pub struct ScheduleHandle {
    purpose: SchedulePurpose,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl ScheduleHandle {
    pub fn new(purpose: SchedulePurpose, token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { purpose, token, join: Some(join) }
    }

    pub fn purpose(&self) -> SchedulePurpose {
        self.purpose
    }

    /// Signal the task to stop; idempotent
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the task to finish, bounded by `timeout`
    pub async fn shutdown(mut self, timeout: Duration) -> SchedulerResult<()> {
        self.token.cancel();
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match tokio::time::timeout(timeout, join).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(SchedulerError::TaskJoinFailed(err.to_string())),
            Err(_) => Err(SchedulerError::Timeout { seconds: timeout.as_secs() }),
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        if self.join.is_some() && !self.token.is_cancelled() {
            warn!(purpose = %self.purpose, "Schedule handle dropped while running, cancelling");
            self.token.cancel();
        }
    }
}
