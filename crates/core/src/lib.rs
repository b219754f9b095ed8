//! # Stride Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Step-detection engine and counting source selection
//! - Service lifecycle state machine and activation policy
//! - Flush pipeline and walking-mode coordination
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `stride-domain`
//! - No database or timer code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod detection;
pub mod lifecycle;
pub mod persistence;
pub mod walking_mode;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export specific items to avoid ambiguity
pub use detection::{select_source, StepDetectorEngine};
pub use lifecycle::ports::{BindEpoch, CountingSourceHandle};
pub use lifecycle::{ActivationInputs, ServiceLifecycleController, ServiceState};
pub use persistence::ports::{StepRecordStore, TrainingStore, WalkingModeStore};
pub use persistence::{PersistenceService, StepEventBus};
pub use walking_mode::WalkingModeCoordinator;
