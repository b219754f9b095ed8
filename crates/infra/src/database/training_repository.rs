//! SQLite-backed training session store

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stride_core::TrainingStore;
use stride_domain::{Result, StrideError, TrainingSession};
use tokio::task;

use super::manager::DbManager;
use crate::errors::{map_join_error, map_sqlite_error};

const ACTIVE_SESSION_SQL: &str = "SELECT id, name, started_at, ended_at FROM trainings
    WHERE ended_at IS NULL ORDER BY started_at DESC LIMIT 1";

const INSERT_SESSION_SQL: &str =
    "INSERT INTO trainings (name, started_at, ended_at) VALUES (?1, ?2, NULL)";

const FINISH_SESSION_SQL: &str =
    "UPDATE trainings SET ended_at = ?2 WHERE id = ?1 AND ended_at IS NULL";

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, i64, Option<i64>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| StrideError::Database(format!("timestamp {millis} out of range")))
}

/// Training session repository backed by the shared pool
pub struct SqliteTrainingRepository {
    db: Arc<DbManager>,
}

impl SqliteTrainingRepository {
    /// Construct a repository backed by the shared database manager
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Start a new training session at `started_at`
    pub async fn start_session(
        &self,
        name: String,
        started_at: DateTime<Utc>,
    ) -> Result<TrainingSession> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<TrainingSession> {
            let conn = db.get_connection()?;
            conn.execute(
                INSERT_SESSION_SQL,
                rusqlite::params![name, started_at.timestamp_millis()],
            )
            .map_err(map_sqlite_error)?;
            let id = conn.last_insert_rowid();
            Ok(TrainingSession { id, name, started_at, ended_at: None })
        })
        .await
        .map_err(map_join_error)?
    }

    /// Mark a running session finished at `ended_at`
    pub async fn finish_session(&self, id: i64, ended_at: DateTime<Utc>) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(FINISH_SESSION_SQL, rusqlite::params![id, ended_at.timestamp_millis()])
                .map_err(map_sqlite_error)?;
            if updated == 0 {
                return Err(StrideError::NotFound(format!("active training {id} not found")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl TrainingStore for SqliteTrainingRepository {
    async fn active_session(&self) -> Result<Option<TrainingSession>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<TrainingSession>> {
            let conn = db.get_connection()?;
            let row = match conn.query_row(ACTIVE_SESSION_SQL, [], row_to_session) {
                Ok(row) => row,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(err) => return Err(map_sqlite_error(err)),
            };
            let (id, name, started_at, ended_at) = row;
            Ok(Some(TrainingSession {
                id,
                name,
                started_at: millis_to_datetime(started_at)?,
                ended_at: ended_at.map(millis_to_datetime).transpose()?,
            }))
        })
        .await
        .map_err(map_join_error)?
    }
}
