//! Connection pool and schema migrations

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use stride_domain::{Result, StrideError};
use tracing::info;

use crate::errors::{map_pool_error, map_sqlite_error};

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS step_counts (
        date TEXT NOT NULL,
        walking_mode_id INTEGER NOT NULL,
        step_count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (date, walking_mode_id)
    );
    CREATE TABLE IF NOT EXISTS walking_modes (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        step_length_m REAL NOT NULL,
        threshold REAL NOT NULL,
        step_threshold INTEGER NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS trainings (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        started_at INTEGER NOT NULL,
        ended_at INTEGER
    );
    CREATE TABLE IF NOT EXISTS preferences (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Owns the SQLite connection pool shared by every repository
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
}

impl DbManager {
    /// Open (or create) the database at `path` with the given pool size
    pub fn new(path: &Path, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(map_pool_error)?;
        info!(path = %path.display(), pool_size, "Database pool created");
        Ok(Self { pool })
    }

    /// Check out a pooled connection
    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(map_pool_error)
    }

    /// Create the schema if it does not exist yet
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sqlite_error)?;
        info!("Database migrations applied");
        Ok(())
    }
}

impl std::fmt::Debug for DbManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbManager").field("pool_state", &self.pool.state()).finish()
    }
}

/// Convert a u64 step delta into the i64 SQLite representation
pub(crate) fn delta_to_i64(delta: u64) -> Result<i64> {
    i64::try_from(delta)
        .map_err(|_| StrideError::InvalidInput(format!("step delta {delta} out of range")))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let temp = TempDir::new().unwrap();
        let manager = DbManager::new(&temp.path().join("steps.db"), 2).unwrap();
        manager.run_migrations().unwrap();
        manager.run_migrations().unwrap();

        let conn = manager.get_connection().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('step_counts', 'walking_modes', 'trainings', 'preferences')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn oversized_delta_is_rejected() {
        assert!(delta_to_i64(u64::MAX).is_err());
        assert_eq!(delta_to_i64(42).unwrap(), 42);
    }
}
