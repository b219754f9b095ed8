//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Stride
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StrideError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduling error: {0}")]
    Scheduling(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Restore error: {0}")]
    Restore(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Stride operations
pub type Result<T> = std::result::Result<T, StrideError>;
