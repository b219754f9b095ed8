//! SQLite-backed walking mode store
//!
//! The active flag is maintained transactionally so at most one mode is
//! active at any time.

use std::sync::Arc;

use async_trait::async_trait;
use stride_core::WalkingModeStore;
use stride_domain::constants::DEFAULT_STEP_LENGTH_M;
use stride_domain::{Result, StrideError, WalkingMode};
use tokio::task;

use super::manager::DbManager;
use crate::errors::{map_join_error, map_sqlite_error};

const ACTIVE_MODE_SQL: &str =
    "SELECT id, name, step_length_m, threshold, step_threshold, is_active
     FROM walking_modes WHERE is_active = 1 LIMIT 1";

const MODE_BY_ID_SQL: &str =
    "SELECT id, name, step_length_m, threshold, step_threshold, is_active
     FROM walking_modes WHERE id = ?1";

const ACTIVATE_MODE_SQL: &str = "UPDATE walking_modes SET is_active = 1 WHERE id = ?1";

const DEACTIVATE_OTHERS_SQL: &str = "UPDATE walking_modes SET is_active = 0 WHERE id != ?1";

const INSERT_MODE_SQL: &str =
    "INSERT INTO walking_modes (name, step_length_m, threshold, step_threshold, is_active)
     VALUES (?1, ?2, ?3, ?4, ?5)";

const MODE_COUNT_SQL: &str = "SELECT COUNT(*) FROM walking_modes";

fn row_to_mode(row: &rusqlite::Row<'_>) -> rusqlite::Result<WalkingMode> {
    Ok(WalkingMode {
        id: row.get(0)?,
        name: row.get(1)?,
        step_length_m: row.get(2)?,
        threshold: row.get(3)?,
        step_threshold: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}

/// Walking mode repository backed by the shared pool
pub struct SqliteWalkingModeRepository {
    db: Arc<DbManager>,
}

impl SqliteWalkingModeRepository {
    /// Construct a repository backed by the shared database manager
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert a new mode and return it with its assigned id
    pub async fn create_mode(
        &self,
        name: String,
        step_length_m: f64,
        threshold: f64,
        step_threshold: u32,
    ) -> Result<WalkingMode> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<WalkingMode> {
            let conn = db.get_connection()?;
            conn.execute(
                INSERT_MODE_SQL,
                rusqlite::params![name, step_length_m, threshold, step_threshold, 0_i64],
            )
            .map_err(map_sqlite_error)?;
            let id = conn.last_insert_rowid();
            Ok(WalkingMode { id, name, step_length_m, threshold, step_threshold, is_active: false })
        })
        .await
        .map_err(map_join_error)?
    }

    /// Seed a default active mode when the table is empty, so the service
    /// always has a mode to attribute steps to.
    pub async fn ensure_seeded(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sqlite_error)?;
            let count: i64 =
                tx.query_row(MODE_COUNT_SQL, [], |row| row.get(0)).map_err(map_sqlite_error)?;
            if count == 0 {
                tx.execute(
                    INSERT_MODE_SQL,
                    rusqlite::params!["normal", DEFAULT_STEP_LENGTH_M, 1.0_f64, 2_u32, 1_i64],
                )
                .map_err(map_sqlite_error)?;
            }
            tx.commit().map_err(map_sqlite_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl WalkingModeStore for SqliteWalkingModeRepository {
    async fn active_mode(&self) -> Result<WalkingMode> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<WalkingMode> {
            let conn = db.get_connection()?;
            conn.query_row(ACTIVE_MODE_SQL, [], row_to_mode).map_err(map_sqlite_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mode_by_id(&self, id: i64) -> Result<Option<WalkingMode>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<WalkingMode>> {
            let conn = db.get_connection()?;
            match conn.query_row(MODE_BY_ID_SQL, rusqlite::params![id], row_to_mode) {
                Ok(mode) => Ok(Some(mode)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_sqlite_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_active_mode(&self, id: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sqlite_error)?;
            let updated =
                tx.execute(ACTIVATE_MODE_SQL, rusqlite::params![id]).map_err(map_sqlite_error)?;
            if updated == 0 {
                // Implicit rollback on drop keeps the previous active mode
                return Err(StrideError::NotFound(format!("walking mode {id} not found")));
            }
            tx.execute(DEACTIVATE_OTHERS_SQL, rusqlite::params![id])
                .map_err(map_sqlite_error)?;
            tx.commit().map_err(map_sqlite_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
