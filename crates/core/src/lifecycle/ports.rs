//! Port interface for the host-controlled counting source

use async_trait::async_trait;
use stride_domain::{Result, SourceKind};

/// Identifies one bind attempt so late ready callbacks can be recognized
pub type BindEpoch = u64;

/// Handle to the host-scheduled counting source (sensor service).
///
/// Binding is asynchronous: `activate` issues the bind request and returns;
/// the host reports readiness later by calling
/// [`ServiceLifecycleController::on_source_ready`] with the epoch it was
/// given. Implementations must make `deactivate` idempotent - the
/// controller calls it again when a stale ready callback arrives.
///
/// [`ServiceLifecycleController::on_source_ready`]: crate::lifecycle::ServiceLifecycleController::on_source_ready
#[async_trait]
pub trait CountingSourceHandle: Send + Sync {
    /// Whether the device has a hardware cumulative step counter.
    /// Queried once per activation.
    fn supports_cumulative_counter(&self) -> bool;

    /// Request binding of the counting source for the given kind
    async fn activate(&self, kind: SourceKind, epoch: BindEpoch) -> Result<()>;

    /// Unbind the counting source; must be idempotent
    async fn deactivate(&self) -> Result<()>;
}
