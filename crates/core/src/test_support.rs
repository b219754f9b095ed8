//! Shared in-memory fakes for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use stride_domain::{Result, SourceKind, StrideError, WalkingMode};

use crate::lifecycle::ports::{BindEpoch, CountingSourceHandle};
use crate::persistence::ports::{StepRecordStore, WalkingModeStore};

pub fn test_mode(id: i64, name: &str, is_active: bool) -> WalkingMode {
    WalkingMode {
        id,
        name: name.to_string(),
        step_length_m: 0.7,
        threshold: 1.2,
        step_threshold: 3,
        is_active,
    }
}

/// In-memory step record store keyed by (date, mode id)
pub struct InMemoryStepRecords {
    rows: Mutex<HashMap<(NaiveDate, i64), u64>>,
    fail_merges: AtomicBool,
}

impl InMemoryStepRecords {
    pub fn new() -> Self {
        Self { rows: Mutex::new(HashMap::new()), fail_merges: AtomicBool::new(false) }
    }

    pub fn failing() -> Self {
        let store = Self::new();
        store.fail_merges.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_merges.store(failing, Ordering::SeqCst);
    }

    pub fn count_for(&self, date: NaiveDate, mode_id: i64) -> u64 {
        self.rows.lock().get(&(date, mode_id)).copied().unwrap_or(0)
    }

    pub fn record_count(&self) -> usize {
        self.rows.lock().len()
    }
}

#[async_trait]
impl StepRecordStore for InMemoryStepRecords {
    async fn merge_step_record(
        &self,
        date: NaiveDate,
        walking_mode_id: i64,
        delta: u64,
    ) -> Result<()> {
        if self.fail_merges.load(Ordering::SeqCst) {
            return Err(StrideError::Database("store unreachable".into()));
        }
        *self.rows.lock().entry((date, walking_mode_id)).or_insert(0) += delta;
        Ok(())
    }

    async fn step_count_for(&self, date: NaiveDate, walking_mode_id: i64) -> Result<u64> {
        Ok(self.count_for(date, walking_mode_id))
    }
}

/// In-memory walking mode store enforcing the single-active invariant
pub struct InMemoryWalkingModes {
    modes: Mutex<Vec<WalkingMode>>,
}

impl InMemoryWalkingModes {
    pub fn new(modes: Vec<WalkingMode>) -> Self {
        Self { modes: Mutex::new(modes) }
    }

    pub fn with_default_mode() -> Self {
        Self::new(vec![test_mode(1, "normal", true)])
    }
}

#[async_trait]
impl WalkingModeStore for InMemoryWalkingModes {
    async fn active_mode(&self) -> Result<WalkingMode> {
        self.modes
            .lock()
            .iter()
            .find(|m| m.is_active)
            .cloned()
            .ok_or_else(|| StrideError::NotFound("no active walking mode".into()))
    }

    async fn mode_by_id(&self, id: i64) -> Result<Option<WalkingMode>> {
        Ok(self.modes.lock().iter().find(|m| m.id == id).cloned())
    }

    async fn set_active_mode(&self, id: i64) -> Result<()> {
        let mut modes = self.modes.lock();
        if !modes.iter().any(|m| m.id == id) {
            return Err(StrideError::NotFound(format!("walking mode {id} not found")));
        }
        for mode in modes.iter_mut() {
            mode.is_active = mode.id == id;
        }
        Ok(())
    }
}

/// Fake counting source handle recording activations
pub struct FakeSourceHandle {
    supports_cumulative: bool,
    fail_activation: AtomicBool,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    last_kind: Mutex<Option<SourceKind>>,
    last_epoch: Mutex<Option<BindEpoch>>,
}

impl FakeSourceHandle {
    pub fn new(supports_cumulative: bool) -> Self {
        Self {
            supports_cumulative,
            fail_activation: AtomicBool::new(false),
            activations: AtomicUsize::new(0),
            deactivations: AtomicUsize::new(0),
            last_kind: Mutex::new(None),
            last_epoch: Mutex::new(None),
        }
    }

    pub fn last_epoch(&self) -> Option<BindEpoch> {
        *self.last_epoch.lock()
    }

    pub fn set_fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn last_kind(&self) -> Option<SourceKind> {
        *self.last_kind.lock()
    }
}

#[async_trait]
impl CountingSourceHandle for FakeSourceHandle {
    fn supports_cumulative_counter(&self) -> bool {
        self.supports_cumulative
    }

    async fn activate(&self, kind: SourceKind, epoch: BindEpoch) -> Result<()> {
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(StrideError::Lifecycle("bind request rejected".into()));
        }
        self.activations.fetch_add(1, Ordering::SeqCst);
        *self.last_kind.lock() = Some(kind);
        *self.last_epoch.lock() = Some(epoch);
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
