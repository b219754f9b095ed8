//! Fire-and-forget step event notifications
//!
//! Replaces a process-wide save-completion listener with channel
//! registration scoped to the orchestrator instance: collaborators
//! subscribe, the flush pipeline publishes, nobody acknowledges.

use stride_domain::constants::STEP_EVENT_CHANNEL_CAPACITY;
use stride_domain::StepEvent;
use tokio::sync::broadcast;

/// Broadcast channel for [`StepEvent`] signals
#[derive(Debug, Clone)]
pub struct StepEventBus {
    tx: broadcast::Sender<StepEvent>,
}

impl StepEventBus {
    /// Create a bus with the default capacity
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STEP_EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<StepEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; dropped silently when nobody is subscribed
    pub fn publish(&self, event: StepEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for StepEventBus {
    fn default() -> Self {
        Self::new()
    }
}
