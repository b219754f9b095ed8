//! Configuration and user preference structures

use std::collections::BTreeSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DAILY_STEP_GOAL, DEFAULT_MOTIVATION_ALERT_TIME_MS};
use crate::errors::{Result, StrideError};

/// Configuration for the application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Timeouts applied to scheduled flush jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub job_timeout_secs: u64,
    pub join_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { job_timeout_secs: 60, join_timeout_secs: 5 }
    }
}

/// A stored preference value
///
/// Untagged so the JSON shape is the value itself: booleans, strings,
/// integers and string sets are distinguishable without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Text(String),
    StringSet(BTreeSet<String>),
}

/// User preferences consumed by the orchestrator.
///
/// The key set mirrors what the backup document recognizes; every key has a
/// fixed expected value type enforced by [`Preferences::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub step_counter_enabled: bool,
    pub use_step_hardware: bool,
    pub use_wake_lock: bool,
    pub use_wake_lock_during_training: bool,
    pub show_velocity: bool,
    pub permanent_notification_show_steps: bool,
    pub permanent_notification_show_distance: bool,
    pub permanent_notification_show_calories: bool,
    pub motivation_alert_enabled: bool,
    /// Milliseconds since local midnight
    pub motivation_alert_time: i64,
    pub motivation_alert_criterion: String,
    pub motivation_alert_texts: BTreeSet<String>,
    pub unit_of_length: String,
    pub unit_of_energy: String,
    pub accelerometer_threshold: String,
    pub accelerometer_step_threshold: String,
    pub daily_step_goal: String,
    pub weight: String,
    pub gender: String,
    /// Distance measurement is active while this is > 0
    pub distance_measurement_start_timestamp: i64,
    pub walking_mode_learning_active: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            step_counter_enabled: true,
            use_step_hardware: false,
            use_wake_lock: false,
            use_wake_lock_during_training: false,
            show_velocity: false,
            permanent_notification_show_steps: true,
            permanent_notification_show_distance: false,
            permanent_notification_show_calories: false,
            motivation_alert_enabled: true,
            motivation_alert_time: DEFAULT_MOTIVATION_ALERT_TIME_MS,
            motivation_alert_criterion: String::new(),
            motivation_alert_texts: BTreeSet::new(),
            unit_of_length: "km".into(),
            unit_of_energy: "kcal".into(),
            accelerometer_threshold: String::new(),
            accelerometer_step_threshold: String::new(),
            daily_step_goal: DEFAULT_DAILY_STEP_GOAL.to_string(),
            weight: String::new(),
            gender: String::new(),
            distance_measurement_start_timestamp: -1,
            walking_mode_learning_active: false,
        }
    }
}

impl Preferences {
    /// Apply one (key, value) pair.
    ///
    /// Rejects unknown keys and wrongly-typed values, which is what makes
    /// backup restores all-or-nothing.
    pub fn apply(&mut self, key: &str, value: &PrefValue) -> Result<()> {
        match (key, value) {
            ("step_counter_enabled", PrefValue::Bool(v)) => self.step_counter_enabled = *v,
            ("use_step_hardware", PrefValue::Bool(v)) => self.use_step_hardware = *v,
            ("use_wake_lock", PrefValue::Bool(v)) => self.use_wake_lock = *v,
            ("use_wake_lock_during_training", PrefValue::Bool(v)) => {
                self.use_wake_lock_during_training = *v;
            }
            ("show_velocity", PrefValue::Bool(v)) => self.show_velocity = *v,
            ("permanent_notification_show_steps", PrefValue::Bool(v)) => {
                self.permanent_notification_show_steps = *v;
            }
            ("permanent_notification_show_distance", PrefValue::Bool(v)) => {
                self.permanent_notification_show_distance = *v;
            }
            ("permanent_notification_show_calories", PrefValue::Bool(v)) => {
                self.permanent_notification_show_calories = *v;
            }
            ("motivation_alert_enabled", PrefValue::Bool(v)) => self.motivation_alert_enabled = *v,
            ("motivation_alert_time", PrefValue::Int(v)) => self.motivation_alert_time = *v,
            ("motivation_alert_criterion", PrefValue::Text(v)) => {
                self.motivation_alert_criterion = v.clone();
            }
            ("motivation_alert_texts", PrefValue::StringSet(v)) => {
                self.motivation_alert_texts = v.clone();
            }
            ("unit_of_length", PrefValue::Text(v)) => self.unit_of_length = v.clone(),
            ("unit_of_energy", PrefValue::Text(v)) => self.unit_of_energy = v.clone(),
            ("accelerometer_threshold", PrefValue::Text(v)) => {
                self.accelerometer_threshold = v.clone();
            }
            ("accelerometer_step_threshold", PrefValue::Text(v)) => {
                self.accelerometer_step_threshold = v.clone();
            }
            ("daily_step_goal", PrefValue::Text(v)) => self.daily_step_goal = v.clone(),
            ("weight", PrefValue::Text(v)) => self.weight = v.clone(),
            ("gender", PrefValue::Text(v)) => self.gender = v.clone(),
            ("distance_measurement_start_timestamp", PrefValue::Int(v)) => {
                self.distance_measurement_start_timestamp = *v;
            }
            ("walking_mode_learning_active", PrefValue::Bool(v)) => {
                self.walking_mode_learning_active = *v;
            }
            (key, value) => {
                return Err(StrideError::InvalidInput(format!(
                    "unknown preference or wrong value type: {key} = {value:?}"
                )));
            }
        }
        Ok(())
    }

    /// Configured motivation alert time-of-day, if representable
    pub fn motivation_alert_time_of_day(&self) -> Option<NaiveTime> {
        let ms = u32::try_from(self.motivation_alert_time).ok()?;
        NaiveTime::from_num_seconds_from_midnight_opt(ms / 1000, 0)
    }

    /// Whether distance measurement mode is currently running
    pub fn distance_measurement_active(&self) -> bool {
        self.distance_measurement_start_timestamp > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_accepts_known_keys_with_expected_types() {
        let mut prefs = Preferences::default();
        prefs.apply("step_counter_enabled", &PrefValue::Bool(false)).unwrap();
        prefs.apply("motivation_alert_time", &PrefValue::Int(3_600_000)).unwrap();
        prefs.apply("daily_step_goal", &PrefValue::Text("12000".into())).unwrap();

        assert!(!prefs.step_counter_enabled);
        assert_eq!(prefs.motivation_alert_time, 3_600_000);
        assert_eq!(prefs.daily_step_goal, "12000");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut prefs = Preferences::default();
        let err = prefs.apply("no_such_pref", &PrefValue::Bool(true)).unwrap_err();
        assert!(matches!(err, StrideError::InvalidInput(_)));
    }

    #[test]
    fn apply_rejects_wrong_value_type() {
        let mut prefs = Preferences::default();
        let err = prefs.apply("step_counter_enabled", &PrefValue::Int(1)).unwrap_err();
        assert!(matches!(err, StrideError::InvalidInput(_)));
    }

    #[test]
    fn default_alert_time_is_six_pm() {
        let prefs = Preferences::default();
        let tod = prefs.motivation_alert_time_of_day().unwrap();
        assert_eq!(tod, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn distance_measurement_requires_positive_timestamp() {
        let mut prefs = Preferences::default();
        assert!(!prefs.distance_measurement_active());
        prefs.distance_measurement_start_timestamp = 1_700_000_000_000;
        assert!(prefs.distance_measurement_active());
    }

    #[test]
    fn pref_value_round_trips_as_untagged_json() {
        let set: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
        for value in [
            PrefValue::Bool(true),
            PrefValue::Int(42),
            PrefValue::Text("steps".into()),
            PrefValue::StringSet(set),
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: PrefValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value);
        }
    }
}
