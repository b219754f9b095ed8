//! All-or-nothing restore of a backup document
//!
//! The document is fully parsed and validated before anything touches the
//! database; the commit then runs inside a single transaction. Any unknown
//! section, unknown preference key, wrongly-typed value or malformed row
//! rejects the whole document and leaves existing state untouched.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use stride_domain::{
    PersistedStepRecord, PrefValue, Preferences, Result, StrideError, TrainingSession,
    WalkingMode,
};
use tokio::task;
use tracing::info;

use crate::database::manager::{delta_to_i64, DbManager};
use crate::errors::{map_join_error, map_sqlite_error};

const SECTION_STEP_COUNTS: &str = "database_stepCount";
const SECTION_TRAININGS: &str = "database_trainings";
const SECTION_WALKING_MODES: &str = "database_walkingMode";
const SECTION_PREFERENCES: &str = "preferences";
const SECTION_TUTORIAL: &str = "tutorial_preferences";

const TUTORIAL_FIRST_LAUNCH_KEY: &str = "IsFirstTimeLaunch";
const TUTORIAL_PREFIX: &str = "tutorial.";

/// A versioned table dump inside the backup document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DbSection<T> {
    #[allow(dead_code)]
    version: u32,
    content: Vec<T>,
}

/// Fully parsed and validated document, ready to commit
#[derive(Debug, Default)]
struct StagedBackup {
    step_records: Vec<PersistedStepRecord>,
    trainings: Vec<TrainingSession>,
    walking_modes: Vec<WalkingMode>,
    preferences: Vec<(String, PrefValue)>,
}

/// Restores backup documents into the live database
pub struct BackupRestorer {
    db: Arc<DbManager>,
}

impl BackupRestorer {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Replace database contents and preferences with the document's.
    ///
    /// All-or-nothing: validation failures reject the document before any
    /// write, and the commit itself is one transaction.
    pub async fn restore(&self, document: String) -> Result<()> {
        let staged = stage(&document)?;
        let db = Arc::clone(&self.db);
        let counts = (
            staged.step_records.len(),
            staged.trainings.len(),
            staged.walking_modes.len(),
            staged.preferences.len(),
        );
        task::spawn_blocking(move || commit(&db, staged)).await.map_err(map_join_error)??;
        info!(
            step_records = counts.0,
            trainings = counts.1,
            walking_modes = counts.2,
            preferences = counts.3,
            "Backup restored"
        );
        Ok(())
    }
}

fn restore_err(context: &str, detail: impl std::fmt::Display) -> StrideError {
    StrideError::Restore(format!("{context}: {detail}"))
}

fn parse_section<T: serde::de::DeserializeOwned>(name: &str, value: Value) -> Result<Vec<T>> {
    let section: DbSection<T> =
        serde_json::from_value(value).map_err(|err| restore_err(name, err))?;
    Ok(section.content)
}

/// Parse and validate the whole document without touching the database
fn stage(document: &str) -> Result<StagedBackup> {
    let root: serde_json::Map<String, Value> =
        serde_json::from_str(document).map_err(|err| restore_err("backup document", err))?;

    let mut staged = StagedBackup::default();
    for (section, value) in root {
        match section.as_str() {
            SECTION_STEP_COUNTS => {
                staged.step_records = parse_section(SECTION_STEP_COUNTS, value)?;
            }
            SECTION_TRAININGS => {
                staged.trainings = parse_section(SECTION_TRAININGS, value)?;
            }
            SECTION_WALKING_MODES => {
                staged.walking_modes = parse_section(SECTION_WALKING_MODES, value)?;
            }
            SECTION_PREFERENCES => {
                let entries: serde_json::Map<String, Value> = serde_json::from_value(value)
                    .map_err(|err| restore_err(SECTION_PREFERENCES, err))?;
                let mut probe = Preferences::default();
                for (key, raw) in entries {
                    let value: PrefValue = serde_json::from_value(raw)
                        .map_err(|err| restore_err(&key, err))?;
                    probe
                        .apply(&key, &value)
                        .map_err(|err| restore_err(SECTION_PREFERENCES, err))?;
                    staged.preferences.push((key, value));
                }
            }
            SECTION_TUTORIAL => {
                let entries: serde_json::Map<String, Value> = serde_json::from_value(value)
                    .map_err(|err| restore_err(SECTION_TUTORIAL, err))?;
                for (key, raw) in entries {
                    if key != TUTORIAL_FIRST_LAUNCH_KEY {
                        return Err(restore_err(
                            SECTION_TUTORIAL,
                            format!("unknown key {key}"),
                        ));
                    }
                    let Value::Bool(flag) = raw else {
                        return Err(restore_err(&key, "expected a boolean"));
                    };
                    staged
                        .preferences
                        .push((format!("{TUTORIAL_PREFIX}{key}"), PrefValue::Bool(flag)));
                }
            }
            other => {
                return Err(restore_err("backup document", format!("unknown section {other}")));
            }
        }
    }

    let active_modes = staged.walking_modes.iter().filter(|m| m.is_active).count();
    if active_modes > 1 {
        return Err(restore_err(
            SECTION_WALKING_MODES,
            format!("{active_modes} modes are marked active"),
        ));
    }

    Ok(staged)
}

/// Write the staged document in one transaction
fn commit(db: &DbManager, staged: StagedBackup) -> Result<()> {
    let mut conn = db.get_connection()?;
    let tx = conn.transaction().map_err(map_sqlite_error)?;

    tx.execute("DELETE FROM step_counts", []).map_err(map_sqlite_error)?;
    for record in &staged.step_records {
        tx.execute(
            "INSERT INTO step_counts (date, walking_mode_id, step_count) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                record.date.to_string(),
                record.walking_mode_id,
                delta_to_i64(record.step_count)?
            ],
        )
        .map_err(map_sqlite_error)?;
    }

    tx.execute("DELETE FROM trainings", []).map_err(map_sqlite_error)?;
    for training in &staged.trainings {
        tx.execute(
            "INSERT INTO trainings (id, name, started_at, ended_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                training.id,
                training.name,
                training.started_at.timestamp_millis(),
                training.ended_at.map(|t| t.timestamp_millis())
            ],
        )
        .map_err(map_sqlite_error)?;
    }

    tx.execute("DELETE FROM walking_modes", []).map_err(map_sqlite_error)?;
    for mode in &staged.walking_modes {
        tx.execute(
            "INSERT INTO walking_modes (id, name, step_length_m, threshold, step_threshold,
             is_active) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                mode.id,
                mode.name,
                mode.step_length_m,
                mode.threshold,
                mode.step_threshold,
                i64::from(mode.is_active)
            ],
        )
        .map_err(map_sqlite_error)?;
    }

    for (key, value) in &staged.preferences {
        let raw = serde_json::to_string(value)
            .map_err(|err| StrideError::Internal(format!("serialize preference: {err}")))?;
        tx.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, raw],
        )
        .map_err(map_sqlite_error)?;
    }

    tx.commit().map_err(map_sqlite_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use stride_core::{StepRecordStore, WalkingModeStore};
    use tempfile::TempDir;

    use super::*;
    use crate::database::{SqliteStepRecordRepository, SqliteWalkingModeRepository};

    fn valid_document() -> String {
        serde_json::json!({
            "database_stepCount": {
                "version": 1,
                "content": [
                    { "date": "2026-08-20", "walking_mode_id": 1, "step_count": 4200 },
                    { "date": "2026-08-21", "walking_mode_id": 1, "step_count": 8100 }
                ]
            },
            "database_walkingMode": {
                "version": 1,
                "content": [
                    { "id": 1, "name": "normal", "step_length_m": 0.7, "threshold": 1.0,
                      "step_threshold": 2, "is_active": true },
                    { "id": 2, "name": "hiking", "step_length_m": 0.9, "threshold": 1.4,
                      "step_threshold": 3, "is_active": false }
                ]
            },
            "database_trainings": {
                "version": 1,
                "content": [
                    { "id": 1, "name": "morning run",
                      "started_at": "2026-08-19T06:30:00Z",
                      "ended_at": "2026-08-19T07:10:00Z" }
                ]
            },
            "preferences": {
                "use_step_hardware": true,
                "daily_step_goal": "12000"
            },
            "tutorial_preferences": {
                "IsFirstTimeLaunch": false
            }
        })
        .to_string()
    }

    async fn setup() -> (Arc<DbManager>, TempDir) {
        let temp = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(&temp.path().join("steps.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (db, temp)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restore_replaces_existing_state() {
        let (db, _temp) = setup().await;
        let records = SqliteStepRecordRepository::new(db.clone());
        let modes = SqliteWalkingModeRepository::new(db.clone());
        modes.ensure_seeded().await.unwrap();
        let stale = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        records.merge_step_record(stale, 1, 999).await.unwrap();

        BackupRestorer::new(db.clone()).restore(valid_document()).await.unwrap();

        assert_eq!(records.step_count_for(stale, 1).await.unwrap(), 0);
        let restored = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        assert_eq!(records.step_count_for(restored, 1).await.unwrap(), 4200);
        let active = modes.active_mode().await.unwrap();
        assert_eq!(active.id, 1);
        assert_eq!(active.name, "normal");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_preference_key_rejects_the_whole_document() {
        let (db, _temp) = setup().await;
        let records = SqliteStepRecordRepository::new(db.clone());
        let kept = NaiveDate::from_ymd_opt(2026, 5, 5).unwrap();
        records.merge_step_record(kept, 1, 777).await.unwrap();

        let mut root: serde_json::Map<String, Value> =
            serde_json::from_str(&valid_document()).unwrap();
        root.get_mut("preferences")
            .and_then(Value::as_object_mut)
            .unwrap()
            .insert("no_such_pref".into(), Value::Bool(true));
        let doc = Value::Object(root).to_string();

        let err = BackupRestorer::new(db.clone()).restore(doc).await.unwrap_err();
        assert!(matches!(err, StrideError::Restore(_)));
        // Existing state untouched
        assert_eq!(records.step_count_for(kept, 1).await.unwrap(), 777);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_section_is_rejected() {
        let (db, _temp) = setup().await;
        let doc = serde_json::json!({ "database_surprise": { "version": 1, "content": [] } })
            .to_string();
        let err = BackupRestorer::new(db).restore(doc).await.unwrap_err();
        assert!(matches!(err, StrideError::Restore(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn multiple_active_walking_modes_are_rejected() {
        let (db, _temp) = setup().await;
        let doc = serde_json::json!({
            "database_walkingMode": {
                "version": 1,
                "content": [
                    { "id": 1, "name": "a", "step_length_m": 0.7, "threshold": 1.0,
                      "step_threshold": 2, "is_active": true },
                    { "id": 2, "name": "b", "step_length_m": 0.9, "threshold": 1.4,
                      "step_threshold": 3, "is_active": true }
                ]
            }
        })
        .to_string();
        let err = BackupRestorer::new(db).restore(doc).await.unwrap_err();
        assert!(matches!(err, StrideError::Restore(_)));
    }

    #[test]
    fn malformed_row_is_rejected_at_staging() {
        let doc = serde_json::json!({
            "database_stepCount": {
                "version": 1,
                "content": [ { "date": "2026-08-20", "steps": 10 } ]
            }
        })
        .to_string();
        assert!(matches!(stage(&doc), Err(StrideError::Restore(_))));
    }

    #[test]
    fn tutorial_section_only_accepts_first_launch_flag() {
        let doc = serde_json::json!({
            "tutorial_preferences": { "SomethingElse": true }
        })
        .to_string();
        assert!(matches!(stage(&doc), Err(StrideError::Restore(_))));
    }
}
