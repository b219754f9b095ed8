//! Periodic and end-of-day persistence scheduling
//!
//! Two timer loops drive flushes: one aligned to half-hour wall-clock
//! boundaries, one firing at 23:59 local time. Each occurrence re-computes
//! its next target from the current wall clock, so the loops self-correct
//! after suspend or clock changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use stride_domain::constants::FLUSH_INTERVAL_MINUTES;
use stride_domain::{FlushTrigger, SchedulerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::alignment::{next_end_of_day, next_half_hour, sleep_duration_until};
use super::error::{SchedulerError, SchedulerResult};
use super::handle::{ScheduleHandle, SchedulePurpose};

/// Work executed on every scheduled occurrence
#[async_trait]
pub trait FlushJob: Send + Sync {
    async fn run(&self, trigger: FlushTrigger) -> stride_domain::Result<()>;
}

/// Timeouts applied to scheduled flushes and scheduler shutdown
#[derive(Debug, Clone, Copy)]
pub struct PersistenceSchedulerConfig {
    pub job_timeout: Duration,
    pub join_timeout: Duration,
}

impl Default for PersistenceSchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for PersistenceSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            join_timeout: Duration::from_secs(config.join_timeout_secs),
        }
    }
}

/// Owns the periodic and end-of-day flush loops
pub struct PersistenceScheduler {
    job: Arc<dyn FlushJob>,
    config: PersistenceSchedulerConfig,
    handles: Mutex<Vec<ScheduleHandle>>,
}

impl PersistenceScheduler {
    pub fn new(job: Arc<dyn FlushJob>, config: PersistenceSchedulerConfig) -> Self {
        Self { job, config, handles: Mutex::new(Vec::new()) }
    }

    /// Arm both flush loops
    pub fn start(&self) -> SchedulerResult<()> {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            return Err(SchedulerError::AlreadyRunning);
        }
        handles.push(self.spawn_loop(SchedulePurpose::PeriodicFlush));
        handles.push(self.spawn_loop(SchedulePurpose::EndOfDayFlush));
        info!("Persistence scheduler started");
        Ok(())
    }

    /// Stop both loops and wait for them to finish
    pub async fn stop(&self) -> SchedulerResult<()> {
        let handles: Vec<ScheduleHandle> = {
            let mut guard = self.handles.lock();
            if guard.is_empty() {
                return Err(SchedulerError::NotRunning);
            }
            guard.drain(..).collect()
        };
        for handle in handles {
            let purpose = handle.purpose();
            if let Err(err) = handle.shutdown(self.config.join_timeout).await {
                warn!(purpose = %purpose, error = %err, "Flush loop did not stop cleanly");
            }
        }
        info!("Persistence scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.handles.lock().is_empty()
    }

    fn spawn_loop(&self, purpose: SchedulePurpose) -> ScheduleHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let job = Arc::clone(&self.job);
        let job_timeout = self.config.job_timeout;
        let join = tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let (target, trigger) = match purpose {
                    SchedulePurpose::EndOfDayFlush => {
                        (next_end_of_day(now), FlushTrigger::EndOfDay)
                    }
                    _ => (next_half_hour(now), FlushTrigger::Periodic),
                };
                let sleep = match sleep_duration_until(target) {
                    Some(sleep) => sleep,
                    None => {
                        // Target fell into a DST gap or slipped past while
                        // resolving; sleep a nominal interval instead
                        warn!(purpose = %purpose, target = %target,
                            "Wall-clock target unresolvable, using nominal interval");
                        Duration::from_secs(u64::from(FLUSH_INTERVAL_MINUTES) * 60)
                    }
                };
                debug!(purpose = %purpose, target = %target, "Flush loop armed");
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = tokio::time::sleep(sleep) => {}
                }
                run_flush(job.as_ref(), trigger, job_timeout).await;
            }
            debug!(purpose = %purpose, "Flush loop exited");
        });
        ScheduleHandle::new(purpose, token, join)
    }
}

impl Drop for PersistenceScheduler {
    fn drop(&mut self) {
        let handles = self.handles.lock();
        if !handles.is_empty() {
            warn!("Persistence scheduler dropped while running, cancelling flush loops");
            for handle in handles.iter() {
                handle.cancel();
            }
        }
    }
}

/// Run one flush occurrence under a timeout, logging the outcome
async fn run_flush(job: &dyn FlushJob, trigger: FlushTrigger, timeout: Duration) {
    match tokio::time::timeout(timeout, job.run(trigger)).await {
        Ok(Ok(())) => {
            debug!(?trigger, "Scheduled flush completed");
        }
        Ok(Err(err)) => {
            error!(?trigger, error = %err, "Scheduled flush failed");
        }
        Err(_) => {
            error!(?trigger, timeout_secs = timeout.as_secs(), "Scheduled flush timed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use stride_domain::StrideError;

    use super::*;

    struct CountingJob {
        runs: AtomicU32,
        behavior: JobBehavior,
    }

    enum JobBehavior {
        Succeed,
        Fail,
        Hang,
    }

    impl CountingJob {
        fn new(behavior: JobBehavior) -> Self {
            Self { runs: AtomicU32::new(0), behavior }
        }
    }

    #[async_trait]
    impl FlushJob for CountingJob {
        async fn run(&self, _trigger: FlushTrigger) -> stride_domain::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                JobBehavior::Succeed => Ok(()),
                JobBehavior::Fail => Err(StrideError::Database("disk full".into())),
                JobBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    fn scheduler(job: Arc<dyn FlushJob>) -> PersistenceScheduler {
        PersistenceScheduler::new(
            job,
            PersistenceSchedulerConfig {
                job_timeout: Duration::from_millis(100),
                join_timeout: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_twice_is_rejected() {
        let sched = scheduler(Arc::new(CountingJob::new(JobBehavior::Succeed)));
        sched.start().unwrap();
        assert!(matches!(sched.start(), Err(SchedulerError::AlreadyRunning)));
        sched.stop().await.unwrap();
        assert!(!sched.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_rejected() {
        let sched = scheduler(Arc::new(CountingJob::new(JobBehavior::Succeed)));
        assert!(matches!(sched.stop().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop_is_allowed() {
        let sched = scheduler(Arc::new(CountingJob::new(JobBehavior::Succeed)));
        sched.start().unwrap();
        sched.stop().await.unwrap();
        sched.start().unwrap();
        assert!(sched.is_running());
        sched.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_flush_invokes_the_job() {
        let job = CountingJob::new(JobBehavior::Succeed);
        run_flush(&job, FlushTrigger::Periodic, Duration::from_secs(1)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_flush_survives_job_errors() {
        let job = CountingJob::new(JobBehavior::Fail);
        run_flush(&job, FlushTrigger::EndOfDay, Duration::from_secs(1)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_flush_abandons_a_hung_job() {
        let job = CountingJob::new(JobBehavior::Hang);
        let started = std::time::Instant::now();
        run_flush(&job, FlushTrigger::Periodic, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
