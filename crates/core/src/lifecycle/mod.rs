//! Counting service lifecycle: activation policy and state machine

pub mod controller;
pub mod policy;
pub mod ports;

pub use controller::{ServiceLifecycleController, ServiceState};
pub use policy::ActivationInputs;
