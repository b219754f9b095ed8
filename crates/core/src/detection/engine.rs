//! Step detector engine - normalizes raw source callbacks into step deltas

use parking_lot::Mutex;
use stride_domain::{SourceKind, SourceSample, StepSession};
use tracing::debug;

/// Owns the active [`StepSession`] and converts raw counter callbacks into a
/// normalized step-delta stream.
///
/// All session access goes through a single lock, so a flush observes a
/// consistent snapshot: a callback arriving during a flush lands either
/// entirely before or entirely after the delta is taken, never split.
#[derive(Debug, Default)]
pub struct StepDetectorEngine {
    session: Mutex<Option<StepSession>>,
}

impl StepDetectorEngine {
    /// Create an engine with no active session
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session for the given source kind, discarding any
    /// previous session state.
    pub fn begin_session(&self, kind: SourceKind) {
        debug!(?kind, "Beginning step session");
        *self.session.lock() = Some(StepSession::new(kind));
    }

    /// Discard the active session, if any
    pub fn end_session(&self) {
        *self.session.lock() = None;
    }

    /// Feed one raw sample from the counting source.
    ///
    /// Returns the normalized delta the sample contributed. Samples arriving
    /// while no session is active are dropped.
    pub fn record_sample(&self, sample: SourceSample) -> u64 {
        match self.session.lock().as_mut() {
            Some(session) => session.consume(sample),
            None => 0,
        }
    }

    /// Steps accumulated since the last flush
    pub fn current_delta(&self) -> u64 {
        self.session.lock().as_ref().map_or(0, |s| s.running_delta)
    }

    /// Source kind of the active session, if any
    pub fn active_kind(&self) -> Option<SourceKind> {
        self.session.lock().as_ref().map(|s| s.kind)
    }

    /// Atomically snapshot the running delta and reset it to zero.
    ///
    /// Returns `None` when no session is active (a flush fired with the
    /// service stopped is a no-op).
    pub fn take_delta(&self) -> Option<u64> {
        self.session.lock().as_mut().map(|session| {
            let delta = session.running_delta;
            session.running_delta = 0;
            delta
        })
    }

    /// Re-credit a delta whose flush failed so it is retried on the next
    /// tick. Steps counted in the meantime simply accumulate on top.
    pub fn restore_delta(&self, delta: u64) {
        if let Some(session) = self.session.lock().as_mut() {
            session.running_delta += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_without_session_are_dropped() {
        let engine = StepDetectorEngine::new();
        assert_eq!(engine.record_sample(SourceSample::Pulse), 0);
        assert_eq!(engine.current_delta(), 0);
        assert_eq!(engine.take_delta(), None);
    }

    #[test]
    fn take_delta_resets_running_count() {
        let engine = StepDetectorEngine::new();
        engine.begin_session(SourceKind::Pulse);
        for _ in 0..7 {
            engine.record_sample(SourceSample::Pulse);
        }

        assert_eq!(engine.take_delta(), Some(7));
        assert_eq!(engine.current_delta(), 0);
        // Session stays alive after a flush
        engine.record_sample(SourceSample::Pulse);
        assert_eq!(engine.current_delta(), 1);
    }

    #[test]
    fn restore_delta_recredits_failed_flush() {
        let engine = StepDetectorEngine::new();
        engine.begin_session(SourceKind::Pulse);
        engine.record_sample(SourceSample::Pulse);
        engine.record_sample(SourceSample::Pulse);

        let taken = engine.take_delta().unwrap();
        // A step arrives while the (failing) store call is in flight
        engine.record_sample(SourceSample::Pulse);
        engine.restore_delta(taken);

        assert_eq!(engine.current_delta(), 3);
    }

    #[test]
    fn begin_session_resets_cumulative_baseline() {
        let engine = StepDetectorEngine::new();
        engine.begin_session(SourceKind::Cumulative);
        engine.record_sample(SourceSample::CumulativeTotal(1_000));
        engine.record_sample(SourceSample::CumulativeTotal(1_010));
        assert_eq!(engine.current_delta(), 10);

        // Restart: the old baseline must not leak into the new session
        engine.begin_session(SourceKind::Cumulative);
        assert_eq!(engine.current_delta(), 0);
        engine.record_sample(SourceSample::CumulativeTotal(2_000));
        engine.record_sample(SourceSample::CumulativeTotal(2_005));
        assert_eq!(engine.current_delta(), 5);
    }

    #[test]
    fn end_session_discards_state() {
        let engine = StepDetectorEngine::new();
        engine.begin_session(SourceKind::Pulse);
        engine.record_sample(SourceSample::Pulse);
        engine.end_session();

        assert_eq!(engine.active_kind(), None);
        assert_eq!(engine.take_delta(), None);
    }
}
