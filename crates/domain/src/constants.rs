//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Persistence scheduling
pub const FLUSH_INTERVAL_MINUTES: u32 = 30;
pub const END_OF_DAY_HOUR: u32 = 23;
pub const END_OF_DAY_MINUTE: u32 = 59;

// Motivation alert defaults (18:00 local, expressed as ms since midnight)
pub const DEFAULT_MOTIVATION_ALERT_TIME_MS: i64 = 64_800_000;

// Step counting defaults
pub const DEFAULT_DAILY_STEP_GOAL: u32 = 10_000;
pub const DEFAULT_STEP_LENGTH_M: f64 = 0.7;

// Event bus configuration
pub const STEP_EVENT_CHANNEL_CAPACITY: usize = 32;
