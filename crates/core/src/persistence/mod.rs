//! Flush pipeline: committing in-memory step deltas to durable storage

pub mod events;
pub mod ports;
pub mod service;

pub use events::StepEventBus;
pub use service::PersistenceService;
