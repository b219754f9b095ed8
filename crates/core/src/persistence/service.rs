//! Flush service - core persistence business logic

use std::sync::Arc;

use chrono::Local;
use stride_domain::{FlushTrigger, Result, StepEvent, WalkingMode};
use tracing::{debug, info, warn};

use super::events::StepEventBus;
use super::ports::{StepRecordStore, WalkingModeStore};
use crate::detection::StepDetectorEngine;

/// Commits the running step delta to durable storage.
///
/// A flush takes the delta atomically, attributes it to a walking mode,
/// merges it into the store and publishes change events. A failed merge
/// re-credits the delta so no steps are dropped; the next scheduled tick
/// retries. The flush future is drop-safe: a caller that abandons it
/// mid-await (a timed-out scheduled run) also re-credits the taken delta.
pub struct PersistenceService {
    engine: Arc<StepDetectorEngine>,
    records: Arc<dyn StepRecordStore>,
    modes: Arc<dyn WalkingModeStore>,
    events: StepEventBus,
}

impl PersistenceService {
    /// Create a new flush service
    pub fn new(
        engine: Arc<StepDetectorEngine>,
        records: Arc<dyn StepRecordStore>,
        modes: Arc<dyn WalkingModeStore>,
        events: StepEventBus,
    ) -> Self {
        Self { engine, records, modes, events }
    }

    /// The event bus collaborators subscribe to
    pub fn events(&self) -> &StepEventBus {
        &self.events
    }

    /// Flush the running delta, attributed to the currently active mode.
    ///
    /// Returns the number of steps committed. A flush with no active
    /// session is a no-op.
    pub async fn flush(&self, trigger: FlushTrigger) -> Result<u64> {
        self.flush_attributed(trigger, None).await
    }

    /// Flush the running delta attributed to an explicit mode (used by the
    /// walking-mode coordinator so steps land on the *outgoing* mode).
    pub async fn flush_attributed(
        &self,
        trigger: FlushTrigger,
        mode_override: Option<&WalkingMode>,
    ) -> Result<u64> {
        let today = Local::now().date_naive();

        let Some(delta) = self.engine.take_delta() else {
            debug!(?trigger, "Flush requested with no active session");
            self.publish_day_end(trigger);
            return Ok(0);
        };

        if delta == 0 {
            debug!(?trigger, "Nothing to flush");
            self.publish_day_end(trigger);
            return Ok(0);
        }

        // Re-credits the taken delta on every exit short of a committed
        // merge, including this future being dropped at an await point
        let mut taken = TakenDelta::new(&self.engine, delta);

        let mode = match mode_override {
            Some(mode) => mode.clone(),
            None => match self.modes.active_mode().await {
                Ok(mode) => mode,
                Err(err) => {
                    warn!(error = %err, "Flush aborted: active walking mode unavailable");
                    return Err(err);
                }
            },
        };

        if let Err(err) = self.records.merge_step_record(today, mode.id, delta).await {
            warn!(error = %err, delta, "Flush failed; delta re-credited for retry");
            return Err(err);
        }
        taken.commit();

        info!(?trigger, delta, walking_mode = %mode.name, "Step count persisted");
        self.events.publish(StepEvent::StepsFlushed {
            date: today,
            walking_mode_id: mode.id,
            delta,
        });
        self.publish_day_end(trigger);
        self.events.publish(StepEvent::SaveCompleted);
        Ok(delta)
    }

    fn publish_day_end(&self, trigger: FlushTrigger) {
        if trigger == FlushTrigger::EndOfDay {
            self.events.publish(StepEvent::DayEnded { date: Local::now().date_naive() });
        }
    }
}

/// A delta taken from the engine but not yet committed to the store.
///
/// Re-credits the delta on drop unless [`commit`](Self::commit) was called,
/// so neither an error return nor a dropped flush future loses steps.
struct TakenDelta<'a> {
    engine: &'a StepDetectorEngine,
    delta: u64,
    committed: bool,
}

impl<'a> TakenDelta<'a> {
    fn new(engine: &'a StepDetectorEngine, delta: u64) -> Self {
        Self { engine, delta, committed: false }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for TakenDelta<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.engine.restore_delta(self.delta);
        }
    }
}
