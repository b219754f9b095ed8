//! Runtime assembly
//!
//! Wires repositories, the detection engine, the lifecycle controller and
//! the schedulers into one object the host embeds. The host supplies the
//! two platform-specific pieces: the counting source handle and the alert
//! notifier.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use stride_core::{
    ActivationInputs, CountingSourceHandle, PersistenceService, ServiceLifecycleController,
    StepDetectorEngine, StepEventBus, WalkingModeCoordinator,
};
use stride_core::{BindEpoch, TrainingStore};
use stride_domain::{Config, FlushTrigger, PrefValue, Result, StepEvent};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::backup::BackupRestorer;
use crate::database::{
    DbManager, SqlitePreferencesRepository, SqliteStepRecordRepository, SqliteTrainingRepository,
    SqliteWalkingModeRepository,
};
use crate::scheduling::{
    FlushJob, MotivationAlertScheduler, MotivationNotifier, PersistenceScheduler,
    PersistenceSchedulerConfig,
};

/// Preference keys that feed the activation policy
const ACTIVATION_KEYS: &[&str] = &[
    "step_counter_enabled",
    "walking_mode_learning_active",
    "distance_measurement_start_timestamp",
];

/// Preference keys that re-arm the motivation alert
const ALERT_KEYS: &[&str] = &["motivation_alert_enabled", "motivation_alert_time"];

/// Bridges the scheduler's job interface onto the flush pipeline
struct RuntimeFlushJob {
    persistence: Arc<PersistenceService>,
}

#[async_trait]
impl FlushJob for RuntimeFlushJob {
    async fn run(&self, trigger: FlushTrigger) -> Result<()> {
        self.persistence.flush(trigger).await.map(|_| ())
    }
}

/// The assembled application
pub struct StrideRuntime {
    engine: Arc<StepDetectorEngine>,
    persistence: Arc<PersistenceService>,
    controller: Arc<ServiceLifecycleController>,
    coordinator: WalkingModeCoordinator,
    preferences: Arc<SqlitePreferencesRepository>,
    trainings: Arc<SqliteTrainingRepository>,
    restorer: BackupRestorer,
    scheduler: PersistenceScheduler,
    alerts: MotivationAlertScheduler,
}

impl StrideRuntime {
    /// Open the database and wire every component.
    ///
    /// `source` binds the platform's step counting callbacks; `notifier`
    /// surfaces the motivation alert.
    pub async fn bootstrap(
        config: &Config,
        source: Arc<dyn CountingSourceHandle>,
        notifier: Arc<dyn MotivationNotifier>,
    ) -> Result<Self> {
        let db = Arc::new(DbManager::new(
            Path::new(&config.database.path),
            config.database.pool_size,
        )?);
        db.run_migrations()?;

        let records = Arc::new(SqliteStepRecordRepository::new(db.clone()));
        let modes = Arc::new(SqliteWalkingModeRepository::new(db.clone()));
        modes.ensure_seeded().await?;
        let trainings = Arc::new(SqliteTrainingRepository::new(db.clone()));
        let preferences = Arc::new(SqlitePreferencesRepository::new(db.clone()));

        let engine = Arc::new(StepDetectorEngine::new());
        let persistence = Arc::new(PersistenceService::new(
            engine.clone(),
            records,
            modes.clone(),
            StepEventBus::new(),
        ));
        let controller = Arc::new(ServiceLifecycleController::new(
            engine.clone(),
            persistence.clone(),
            source,
        ));
        let coordinator = WalkingModeCoordinator::new(persistence.clone(), modes);

        let scheduler_config = PersistenceSchedulerConfig::from(&config.scheduler);
        let scheduler = PersistenceScheduler::new(
            Arc::new(RuntimeFlushJob { persistence: persistence.clone() }),
            scheduler_config,
        );
        let alerts = MotivationAlertScheduler::new(notifier, scheduler_config.join_timeout);

        info!("Runtime assembled");
        Ok(Self {
            engine,
            persistence,
            controller,
            coordinator,
            preferences,
            trainings,
            restorer: BackupRestorer::new(db),
            scheduler,
            alerts,
        })
    }

    /// Arm the schedulers and apply the activation policy
    pub async fn start(&self) -> Result<()> {
        self.scheduler.start()?;
        self.refresh_motivation_alert().await?;
        self.apply_policy().await
    }

    /// Re-evaluate the activation policy against stored preferences and the
    /// current training state
    pub async fn apply_policy(&self) -> Result<()> {
        let (inputs, prefer_hardware) = self.activation_inputs().await?;
        self.controller.apply_policy(&inputs, prefer_hardware).await
    }

    async fn activation_inputs(&self) -> Result<(ActivationInputs, bool)> {
        let prefs = self.preferences.load().await?;
        let training = self.trainings.active_session().await?;
        let inputs = ActivationInputs {
            user_enabled: prefs.step_counter_enabled,
            training_active: training.is_some(),
            walking_mode_learning_active: prefs.walking_mode_learning_active,
            distance_measurement_start_timestamp: prefs.distance_measurement_start_timestamp,
        };
        Ok((inputs, prefs.use_step_hardware))
    }

    /// Arm or disarm the motivation alert per stored preferences
    pub async fn refresh_motivation_alert(&self) -> Result<()> {
        let prefs = self.preferences.load().await?;
        match (prefs.motivation_alert_enabled, prefs.motivation_alert_time_of_day()) {
            (true, Some(tod)) => self.alerts.reschedule(tod).await,
            (true, None) => {
                warn!(
                    time_ms = prefs.motivation_alert_time,
                    "Alert time not representable; alert disabled"
                );
                self.alerts.disable().await;
            }
            (false, _) => self.alerts.disable().await,
        }
        Ok(())
    }

    /// Store one preference and propagate its side effects.
    ///
    /// Activation-relevant keys re-apply the policy, the hardware-counter
    /// preference rebinds the source, alert keys re-arm the alert.
    pub async fn update_preference(&self, key: &str, value: PrefValue) -> Result<()> {
        self.preferences.set(key, value).await?;

        if key == "use_step_hardware" {
            let (inputs, prefer_hardware) = self.activation_inputs().await?;
            return self.controller.restart(&inputs, prefer_hardware).await;
        }
        if ACTIVATION_KEYS.contains(&key) {
            return self.apply_policy().await;
        }
        if ALERT_KEYS.contains(&key) {
            return self.refresh_motivation_alert().await;
        }
        Ok(())
    }

    /// Switch the active walking mode (flush-then-switch)
    pub async fn switch_walking_mode(&self, new_mode_id: i64) -> Result<()> {
        self.coordinator.switch_active_mode(new_mode_id).await
    }

    /// Flush the running delta immediately
    pub async fn force_flush(&self) -> Result<u64> {
        self.persistence.flush(FlushTrigger::Forced).await
    }

    /// Restore a backup document, then re-apply everything derived from the
    /// restored preferences
    pub async fn restore_backup(&self, document: String) -> Result<()> {
        self.restorer.restore(document).await?;
        self.refresh_motivation_alert().await?;
        self.apply_policy().await
    }

    /// Register a step event subscriber
    pub fn subscribe_events(&self) -> broadcast::Receiver<StepEvent> {
        self.persistence.events().subscribe()
    }

    /// Host callback: the counting source bind completed
    pub async fn on_source_ready(&self, epoch: BindEpoch) {
        self.controller.on_source_ready(epoch).await;
    }

    /// The detection engine the host feeds raw samples into
    pub fn engine(&self) -> &Arc<StepDetectorEngine> {
        &self.engine
    }

    /// The lifecycle controller, for hosts that drive transitions directly
    pub fn controller(&self) -> &Arc<ServiceLifecycleController> {
        &self.controller
    }

    /// Stop counting and tear down the schedulers
    pub async fn shutdown(&self) -> Result<()> {
        self.controller.stop().await?;
        self.alerts.disable().await;
        if self.scheduler.is_running() {
            self.scheduler.stop().await?;
        }
        info!("Runtime shut down");
        Ok(())
    }
}

impl std::fmt::Debug for StrideRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrideRuntime")
            .field("scheduler_running", &self.scheduler.is_running())
            .finish()
    }
}
