//! # Stride Domain
//!
//! Business domain types and models for Stride.
//!
//! This crate contains:
//! - Domain data types (step sessions, walking modes, step records)
//! - Domain error types and Result definitions
//! - Configuration and preference structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Stride crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
