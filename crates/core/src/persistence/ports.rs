//! Port interfaces for step persistence
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use chrono::NaiveDate;
use stride_domain::{Result, TrainingSession, WalkingMode};

/// Durable store for per-day, per-mode step counts.
///
/// Implementations must satisfy at-least-once merge semantics: one logical
/// record per (date, walking mode) pair, with merges incrementing the
/// existing record rather than creating duplicates.
#[async_trait]
pub trait StepRecordStore: Send + Sync {
    /// Merge a step delta into the record for the given date and mode
    async fn merge_step_record(
        &self,
        date: NaiveDate,
        walking_mode_id: i64,
        delta: u64,
    ) -> Result<()>;

    /// Persisted step count for the given date and mode (0 when absent)
    async fn step_count_for(&self, date: NaiveDate, walking_mode_id: i64) -> Result<u64>;
}

/// Store for walking modes; at most one mode is active at any time
#[async_trait]
pub trait WalkingModeStore: Send + Sync {
    /// The currently active walking mode
    async fn active_mode(&self) -> Result<WalkingMode>;

    /// Look up a mode by id
    async fn mode_by_id(&self, id: i64) -> Result<Option<WalkingMode>>;

    /// Mark the given mode active and every other mode inactive.
    ///
    /// Must be transactional: a missing target id leaves the previous
    /// active mode in place.
    async fn set_active_mode(&self, id: i64) -> Result<()>;
}

/// Read access to training sessions (activation policy input)
#[async_trait]
pub trait TrainingStore: Send + Sync {
    /// The currently running training session, if any
    async fn active_session(&self) -> Result<Option<TrainingSession>>;
}
