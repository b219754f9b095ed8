//! Wall-clock scheduling for persistence flushes and motivation alerts
//!
//! All timers are computed against local wall-clock time (half-hour aligned
//! flushes, 23:59 end-of-day, a daily alert time) rather than fixed
//! intervals, so they stay aligned across drift and restarts. Every spawned
//! task is cancellable and joined on stop.

pub mod alignment;
pub mod error;
pub mod handle;
pub mod motivation_scheduler;
pub mod persistence_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use handle::{ScheduleHandle, SchedulePurpose};
pub use motivation_scheduler::{MotivationAlertScheduler, MotivationNotifier};
pub use persistence_scheduler::{FlushJob, PersistenceScheduler, PersistenceSchedulerConfig};
