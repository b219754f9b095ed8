//! Walking-mode coordination

pub mod coordinator;

pub use coordinator::WalkingModeCoordinator;
