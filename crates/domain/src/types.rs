//! Common data types used throughout the application

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of counting source the engine is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// One event per detected step (software / accelerometer-derived)
    Pulse,
    /// Running total that may carry over across reboots (hardware counter)
    Cumulative,
}

/// A single raw callback from the counting source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSample {
    /// Exactly one detected step
    Pulse,
    /// The device's running total at sample time
    CumulativeTotal(u64),
}

/// In-memory counting state for one activation of the engine.
///
/// `running_delta` is steps-since-last-flush. For cumulative sources the
/// baseline is captured lazily from the first reading and re-anchored after
/// every sample, so whatever the hardware counted before this session never
/// leaks into the delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSession {
    pub kind: SourceKind,
    pub running_delta: u64,
    pub baseline_offset: Option<u64>,
}

impl StepSession {
    /// Create a fresh session with a zero delta
    pub fn new(kind: SourceKind) -> Self {
        Self { kind, running_delta: 0, baseline_offset: None }
    }

    /// Consume one raw sample and return the normalized step delta it
    /// contributed.
    ///
    /// A cumulative reading below the current baseline is anomalous (the
    /// counter is not expected to reset mid-session) and is discarded; the
    /// delta never decreases.
    pub fn consume(&mut self, sample: SourceSample) -> u64 {
        match (self.kind, sample) {
            (SourceKind::Pulse, SourceSample::Pulse) => {
                self.running_delta += 1;
                1
            }
            (SourceKind::Cumulative, SourceSample::CumulativeTotal(total)) => {
                let Some(baseline) = self.baseline_offset else {
                    self.baseline_offset = Some(total);
                    return 0;
                };
                if total < baseline {
                    return 0;
                }
                let delta = total - baseline;
                self.running_delta += delta;
                self.baseline_offset = Some(total);
                delta
            }
            // A sample of the wrong shape for this source is ignored
            _ => 0,
        }
    }
}

/// A named counting context; exactly one mode is active at a time.
///
/// The threshold fields are opaque tunables consumed by the accelerometer
/// peak detector, not interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkingMode {
    pub id: i64,
    pub name: String,
    pub step_length_m: f64,
    pub threshold: f64,
    pub step_threshold: u32,
    pub is_active: bool,
}

/// One logical persisted row per (date, walking mode) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedStepRecord {
    pub date: NaiveDate,
    pub walking_mode_id: i64,
    pub step_count: u64,
}

/// A training session; active while `ended_at` is unset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingSession {
    pub id: i64,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TrainingSession {
    /// Whether the session is still running
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Why a flush was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Half-hour-aligned periodic persistence
    Periodic,
    /// The 23:59 end-of-day persistence
    EndOfDay,
    /// Forced flush attributed to the outgoing mode during a mode switch
    ModeSwitch,
    /// Final flush before the counting service stops
    FinalBeforeStop,
    /// Caller-requested immediate flush
    Forced,
}

/// Fire-and-forget signals consumed by widget-refresh collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    StepsFlushed { date: NaiveDate, walking_mode_id: i64, delta: u64 },
    DayEnded { date: NaiveDate },
    SaveCompleted,
}
