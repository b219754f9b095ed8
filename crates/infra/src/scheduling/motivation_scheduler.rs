//! Daily motivation alert scheduling
//!
//! One cancellable loop fires a notifier at a configured local time of day.
//! Rescheduling replaces the armed loop; disabling cancels it. Both are
//! idempotent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveTime};
use stride_domain::Result;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::alignment::{next_time_of_day, sleep_duration_until};
use super::handle::{ScheduleHandle, SchedulePurpose};

const NOMINAL_RETRY: Duration = Duration::from_secs(60);

/// Delivery side of the motivation alert; the host surfaces the alert
#[async_trait]
pub trait MotivationNotifier: Send + Sync {
    async fn notify(&self) -> Result<()>;
}

/// Arms and re-arms the daily alert loop
pub struct MotivationAlertScheduler {
    notifier: Arc<dyn MotivationNotifier>,
    join_timeout: Duration,
    handle: Mutex<Option<ScheduleHandle>>,
}

impl MotivationAlertScheduler {
    pub fn new(notifier: Arc<dyn MotivationNotifier>, join_timeout: Duration) -> Self {
        Self { notifier, join_timeout, handle: Mutex::new(None) }
    }

    /// Arm the daily loop at `tod`, replacing any previously armed loop
    pub async fn reschedule(&self, tod: NaiveTime) {
        let mut slot = self.handle.lock().await;
        if let Some(previous) = slot.take() {
            if let Err(err) = previous.shutdown(self.join_timeout).await {
                warn!(error = %err, "Previous alert loop did not stop cleanly");
            }
        }
        *slot = Some(self.spawn_loop(tod));
        info!(time_of_day = %tod, "Motivation alert scheduled");
    }

    /// Cancel the armed loop, if any; idempotent
    pub async fn disable(&self) {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.take() {
            if let Err(err) = handle.shutdown(self.join_timeout).await {
                warn!(error = %err, "Alert loop did not stop cleanly");
            }
            info!("Motivation alert disabled");
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    fn spawn_loop(&self, tod: NaiveTime) -> ScheduleHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let notifier = Arc::clone(&self.notifier);
        let join = tokio::spawn(async move {
            loop {
                let target = next_time_of_day(Local::now().naive_local(), tod);
                let sleep = match sleep_duration_until(target) {
                    Some(sleep) => sleep,
                    None => {
                        warn!(target = %target,
                            "Alert target unresolvable, retrying after nominal delay");
                        NOMINAL_RETRY
                    }
                };
                debug!(target = %target, "Motivation alert armed");
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = tokio::time::sleep(sleep) => {}
                }
                if let Err(err) = notifier.notify().await {
                    error!(error = %err, "Motivation alert delivery failed");
                }
            }
            debug!("Motivation alert loop exited");
        });
        ScheduleHandle::new(SchedulePurpose::MotivationAlert, token, join)
    }
}
