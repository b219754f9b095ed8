//! Step detection: counting source selection and delta normalization

pub mod engine;
pub mod selector;

pub use engine::StepDetectorEngine;
pub use selector::select_source;
