//! # Stride Infra
//!
//! Infrastructure layer - adapters for the ports defined in `stride-core`.
//!
//! This crate contains:
//! - SQLite repositories (step records, walking modes, trainings,
//!   preferences) behind an r2d2 connection pool
//! - Wall-clock schedulers for periodic/end-of-day persistence and the
//!   daily motivation alert
//! - Backup restore (all-or-nothing)
//! - Configuration loading and runtime assembly
//!
//! ## Architecture Principles
//! - Implements `stride-core` ports; no business rules live here
//! - Blocking database work runs on the blocking thread pool
//! - Every spawned timer task is cancellable and joined on stop

pub mod backup;
pub mod config;
pub mod database;
pub mod errors;
pub mod runtime;
pub mod scheduling;

pub use backup::BackupRestorer;
pub use database::{
    DbManager, SqlitePreferencesRepository, SqliteStepRecordRepository,
    SqliteTrainingRepository, SqliteWalkingModeRepository,
};
pub use runtime::StrideRuntime;
pub use scheduling::{
    FlushJob, MotivationAlertScheduler, MotivationNotifier, PersistenceScheduler,
    PersistenceSchedulerConfig, SchedulerError, SchedulerResult, SchedulePurpose,
};
