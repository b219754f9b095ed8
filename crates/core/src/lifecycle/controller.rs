//! Service lifecycle state machine
//!
//! Mediates start/stop/rebind requests from every interested caller without
//! conflicting transitions. Binding to the counting source is asynchronous;
//! bind epochs guard against connect callbacks that arrive after a stop.

use std::sync::Arc;

use stride_domain::{FlushTrigger, Result, SourceKind};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::policy::ActivationInputs;
use super::ports::{BindEpoch, CountingSourceHandle};
use crate::detection::{select_source, StepDetectorEngine};
use crate::persistence::PersistenceService;

/// Lifecycle state of the counting service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Inner {
    state: ServiceState,
    bind_epoch: BindEpoch,
    active_kind: Option<SourceKind>,
}

/// State machine governing whether counting is currently active.
///
/// All transitions run under one async mutex, so a stop serializes its
/// final flush before the source is deactivated, and re-entrant start/stop
/// requests are cheap no-ops.
pub struct ServiceLifecycleController {
    inner: Mutex<Inner>,
    engine: Arc<StepDetectorEngine>,
    persistence: Arc<PersistenceService>,
    source: Arc<dyn CountingSourceHandle>,
}

impl ServiceLifecycleController {
    /// Create a controller in the `Stopped` state
    pub fn new(
        engine: Arc<StepDetectorEngine>,
        persistence: Arc<PersistenceService>,
        source: Arc<dyn CountingSourceHandle>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ServiceState::Stopped,
                bind_epoch: 0,
                active_kind: None,
            }),
            engine,
            persistence,
            source,
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ServiceState {
        self.inner.lock().await.state
    }

    /// Source kind of the current activation, if any
    pub async fn active_kind(&self) -> Option<SourceKind> {
        self.inner.lock().await.active_kind
    }

    /// Start the counting service.
    ///
    /// Selects the source once, begins a fresh session and issues the bind
    /// request; the service stays `Starting` until the host confirms via
    /// [`on_source_ready`](Self::on_source_ready). Idempotent while
    /// `Starting` or `Running` - no second bind request is issued while one
    /// is outstanding.
    pub async fn start(&self, prefer_hardware: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ServiceState::Starting | ServiceState::Running => {
                debug!(state = ?inner.state, "Start requested while already active");
                return Ok(());
            }
            ServiceState::Stopped | ServiceState::Stopping => {}
        }

        let kind = select_source(self.source.supports_cumulative_counter(), prefer_hardware);
        self.engine.begin_session(kind);
        inner.bind_epoch += 1;
        inner.state = ServiceState::Starting;
        inner.active_kind = Some(kind);

        if let Err(err) = self.source.activate(kind, inner.bind_epoch).await {
            self.engine.end_session();
            inner.state = ServiceState::Stopped;
            inner.active_kind = None;
            warn!(error = %err, "Counting source bind request failed");
            return Err(err);
        }

        info!(?kind, epoch = inner.bind_epoch, "Counting source bind requested");
        Ok(())
    }

    /// Host confirmation that the counting source is bound.
    ///
    /// A callback arriving after a stop must not transition state back to
    /// `Running`; the source is unbound instead so nothing leaks. While the
    /// service is active, duplicate confirmations and confirmations for a
    /// superseded bind are ignored - deactivating here would unbind the
    /// live source.
    pub async fn on_source_ready(&self, epoch: BindEpoch) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ServiceState::Starting if epoch == inner.bind_epoch => {
                inner.state = ServiceState::Running;
                info!(epoch, "Counting source running");
            }
            ServiceState::Stopping | ServiceState::Stopped => {
                warn!(
                    epoch,
                    current_epoch = inner.bind_epoch,
                    state = ?inner.state,
                    "Ready callback after stop; unbinding"
                );
                if let Err(err) = self.source.deactivate().await {
                    debug!(error = %err, "Deactivation after stale callback failed");
                }
            }
            _ => {
                debug!(
                    epoch,
                    current_epoch = inner.bind_epoch,
                    state = ?inner.state,
                    "Duplicate or superseded ready callback ignored"
                );
            }
        }
    }

    /// Stop the counting service.
    ///
    /// The pending delta is always flushed before the source is
    /// deactivated; a failed flush aborts the stop so no steps are
    /// discarded with the session. Idempotent while `Stopped`.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ServiceState::Stopped | ServiceState::Stopping => {
                debug!(state = ?inner.state, "Stop requested while already inactive");
                return Ok(());
            }
            ServiceState::Starting | ServiceState::Running => {}
        }

        let resume_state = inner.state;
        inner.state = ServiceState::Stopping;

        if let Err(err) = self.persistence.flush(FlushTrigger::FinalBeforeStop).await {
            inner.state = resume_state;
            warn!(error = %err, "Final flush failed; stop aborted, delta retained");
            return Err(err);
        }

        // Invalidate any in-flight ready callback before unbinding
        inner.bind_epoch += 1;
        if let Err(err) = self.source.deactivate().await {
            warn!(error = %err, "Counting source deactivation reported failure");
        }
        self.engine.end_session();
        inner.state = ServiceState::Stopped;
        inner.active_kind = None;
        info!("Counting service stopped");
        Ok(())
    }

    /// Start or stop according to the current activation policy
    pub async fn apply_policy(
        &self,
        inputs: &ActivationInputs,
        prefer_hardware: bool,
    ) -> Result<()> {
        if inputs.is_activation_required() {
            self.start(prefer_hardware).await
        } else {
            self.stop().await
        }
    }

    /// Flush, unbind and re-apply the policy with a fresh source selection.
    ///
    /// Used when device capability or the hardware-counter preference
    /// changes at runtime.
    pub async fn restart(&self, inputs: &ActivationInputs, prefer_hardware: bool) -> Result<()> {
        self.stop().await?;
        self.apply_policy(inputs, prefer_hardware).await
    }
}
