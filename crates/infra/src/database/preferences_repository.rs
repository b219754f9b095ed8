//! SQLite-backed preference store
//!
//! Values are stored as JSON text so booleans, integers, strings and string
//! sets survive round trips without a type column.

use std::sync::Arc;

use stride_domain::{PrefValue, Preferences, Result, StrideError};
use tokio::task;
use tracing::warn;

use super::manager::DbManager;
use crate::errors::{map_join_error, map_sqlite_error};

const GET_PREF_SQL: &str = "SELECT value FROM preferences WHERE key = ?1";

const SET_PREF_SQL: &str =
    "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)";

const ALL_PREFS_SQL: &str = "SELECT key, value FROM preferences";

/// Preference repository backed by the shared pool
pub struct SqlitePreferencesRepository {
    db: Arc<DbManager>,
}

impl SqlitePreferencesRepository {
    /// Construct a repository backed by the shared database manager
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Fetch a single preference value, if stored
    pub async fn get(&self, key: &str) -> Result<Option<PrefValue>> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        task::spawn_blocking(move || -> Result<Option<PrefValue>> {
            let conn = db.get_connection()?;
            let raw: String = match conn.query_row(GET_PREF_SQL, [&key], |row| row.get(0)) {
                Ok(raw) => raw,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(err) => return Err(map_sqlite_error(err)),
            };
            let value = serde_json::from_str(&raw).map_err(|err| {
                StrideError::Database(format!("corrupt preference {key}: {err}"))
            })?;
            Ok(Some(value))
        })
        .await
        .map_err(map_join_error)?
    }

    /// Store a single preference value.
    ///
    /// The key must be known and the value correctly typed; validation uses
    /// the same rules as backup restore.
    pub async fn set(&self, key: &str, value: PrefValue) -> Result<()> {
        Preferences::default().apply(key, &value)?;
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let raw = serde_json::to_string(&value)
                .map_err(|err| StrideError::Internal(format!("serialize preference: {err}")))?;
            conn.execute(SET_PREF_SQL, rusqlite::params![key, raw]).map_err(map_sqlite_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Load the full preference set, falling back to defaults.
    ///
    /// Unknown or corrupt rows are skipped with a warning so one bad row
    /// never blocks startup.
    pub async fn load(&self) -> Result<Preferences> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Preferences> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(ALL_PREFS_SQL).map_err(map_sqlite_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(map_sqlite_error)?;

            let mut prefs = Preferences::default();
            for row in rows {
                let (key, raw) = row.map_err(map_sqlite_error)?;
                let value: PrefValue = match serde_json::from_str(&raw) {
                    Ok(value) => value,
                    Err(err) => {
                        warn!(key = %key, error = %err, "Skipping unparseable preference row");
                        continue;
                    }
                };
                if let Err(err) = prefs.apply(&key, &value) {
                    warn!(key = %key, error = %err, "Skipping unrecognized preference row");
                }
            }
            Ok(prefs)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (SqlitePreferencesRepository, TempDir) {
        let temp = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(&temp.path().join("steps.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (SqlitePreferencesRepository::new(db), temp)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_then_load_reflects_the_stored_value() {
        let (repo, _temp) = setup().await;
        repo.set("use_step_hardware", PrefValue::Bool(true)).await.unwrap();
        repo.set("motivation_alert_time", PrefValue::Int(7_200_000)).await.unwrap();

        let prefs = repo.load().await.unwrap();
        assert!(prefs.use_step_hardware);
        assert_eq!(prefs.motivation_alert_time, 7_200_000);
        // Untouched keys keep their defaults
        assert!(prefs.step_counter_enabled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_rejects_unknown_keys_and_wrong_types() {
        let (repo, _temp) = setup().await;
        assert!(repo.set("no_such_pref", PrefValue::Bool(true)).await.is_err());
        assert!(repo.set("use_step_hardware", PrefValue::Text("yes".into())).await.is_err());
        assert!(repo.get("no_such_pref").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_skips_rows_it_cannot_interpret() {
        let (repo, _temp) = setup().await;
        repo.set("show_velocity", PrefValue::Bool(true)).await.unwrap();
        {
            let conn = repo.db.get_connection().unwrap();
            conn.execute(SET_PREF_SQL, rusqlite::params!["tutorial.IsFirstTimeLaunch", "false"])
                .unwrap();
            conn.execute(SET_PREF_SQL, rusqlite::params!["show_velocity_broken", "not json {"])
                .unwrap();
        }

        let prefs = repo.load().await.unwrap();
        assert!(prefs.show_velocity);
    }
}
