//! SQLite-backed step record store
//!
//! One logical row per (date, walking mode): merges increment the existing
//! record instead of inserting duplicates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use stride_core::StepRecordStore;
use stride_domain::Result;
use tokio::task;

use super::manager::{delta_to_i64, DbManager};
use crate::errors::{map_join_error, map_sqlite_error};

const MERGE_RECORD_SQL: &str = "INSERT INTO step_counts (date, walking_mode_id, step_count)
    VALUES (?1, ?2, ?3)
    ON CONFLICT (date, walking_mode_id)
    DO UPDATE SET step_count = step_count + excluded.step_count";

const COUNT_FOR_SQL: &str = "SELECT COALESCE(SUM(step_count), 0) FROM step_counts
    WHERE date = ?1 AND walking_mode_id = ?2";

/// Step record repository backed by the shared pool
pub struct SqliteStepRecordRepository {
    db: Arc<DbManager>,
}

impl SqliteStepRecordRepository {
    /// Construct a repository backed by the shared database manager
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StepRecordStore for SqliteStepRecordRepository {
    async fn merge_step_record(
        &self,
        date: NaiveDate,
        walking_mode_id: i64,
        delta: u64,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let delta = delta_to_i64(delta)?;
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                MERGE_RECORD_SQL,
                rusqlite::params![date.to_string(), walking_mode_id, delta],
            )
            .map_err(map_sqlite_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn step_count_for(&self, date: NaiveDate, walking_mode_id: i64) -> Result<u64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<u64> {
            let conn = db.get_connection()?;
            let count: i64 = conn
                .query_row(
                    COUNT_FOR_SQL,
                    rusqlite::params![date.to_string(), walking_mode_id],
                    |row| row.get(0),
                )
                .map_err(map_sqlite_error)?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (SqliteStepRecordRepository, TempDir) {
        let temp = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(&temp.path().join("steps.db"), 2).unwrap());
        db.run_migrations().unwrap();
        (SqliteStepRecordRepository::new(db), temp)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn merge_creates_then_increments_one_row() {
        let (repo, _temp) = setup().await;
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();

        repo.merge_step_record(date, 1, 100).await.unwrap();
        repo.merge_step_record(date, 1, 23).await.unwrap();

        assert_eq!(repo.step_count_for(date, 1).await.unwrap(), 123);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn records_are_keyed_by_date_and_mode() {
        let (repo, _temp) = setup().await;
        let monday = NaiveDate::from_ymd_opt(2026, 8, 17).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 8, 18).unwrap();

        repo.merge_step_record(monday, 1, 10).await.unwrap();
        repo.merge_step_record(monday, 2, 20).await.unwrap();
        repo.merge_step_record(tuesday, 1, 30).await.unwrap();

        assert_eq!(repo.step_count_for(monday, 1).await.unwrap(), 10);
        assert_eq!(repo.step_count_for(monday, 2).await.unwrap(), 20);
        assert_eq!(repo.step_count_for(tuesday, 1).await.unwrap(), 30);
        assert_eq!(repo.step_count_for(tuesday, 2).await.unwrap(), 0);
    }
}
