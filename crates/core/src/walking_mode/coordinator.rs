//! Walking-mode switch transaction
//!
//! Switching modes while counting is live must never attribute unflushed
//! steps to the wrong mode: the pending delta is flushed against the
//! outgoing mode before the active flag moves.

use std::sync::Arc;

use stride_domain::{FlushTrigger, Result, StrideError, WalkingMode};
use tracing::{info, warn};

use crate::persistence::ports::WalkingModeStore;
use crate::persistence::PersistenceService;

/// Tracks the active walking mode and runs the flush-then-switch
/// transaction.
pub struct WalkingModeCoordinator {
    persistence: Arc<PersistenceService>,
    modes: Arc<dyn WalkingModeStore>,
}

impl WalkingModeCoordinator {
    /// Create a new coordinator
    pub fn new(persistence: Arc<PersistenceService>, modes: Arc<dyn WalkingModeStore>) -> Self {
        Self { persistence, modes }
    }

    /// The currently active walking mode
    pub async fn active_mode(&self) -> Result<WalkingMode> {
        self.modes.active_mode().await
    }

    /// Switch the active walking mode.
    ///
    /// Transaction order: (1) flush the running delta attributed to the
    /// *old* mode - any failure aborts the switch with the old mode still
    /// active and the delta retained for retry; (2) flip the active flag;
    /// counting then continues, destined for the new mode on the next
    /// flush. Switching to the already-active mode is a no-op.
    pub async fn switch_active_mode(&self, new_mode_id: i64) -> Result<()> {
        let old_mode = self.modes.active_mode().await?;
        if old_mode.id == new_mode_id {
            return Ok(());
        }

        if self.modes.mode_by_id(new_mode_id).await?.is_none() {
            return Err(StrideError::NotFound(format!("walking mode {new_mode_id} not found")));
        }

        if let Err(err) =
            self.persistence.flush_attributed(FlushTrigger::ModeSwitch, Some(&old_mode)).await
        {
            warn!(
                error = %err,
                old_mode = %old_mode.name,
                new_mode_id,
                "Mode switch aborted: flush for the outgoing mode failed"
            );
            return Err(err);
        }

        self.modes.set_active_mode(new_mode_id).await?;
        info!(old_mode = %old_mode.name, new_mode_id, "Walking mode switched");
        Ok(())
    }
}
