//! Error conversions from infrastructure crates into [`StrideError`]

use stride_domain::StrideError;
use tokio::task::JoinError;

/// Map a rusqlite error into the domain error type
pub fn map_sqlite_error(err: rusqlite::Error) -> StrideError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => {
            StrideError::NotFound("query returned no rows".into())
        }
        other => StrideError::Database(other.to_string()),
    }
}

/// Map a connection pool error into the domain error type
pub fn map_pool_error(err: r2d2::Error) -> StrideError {
    StrideError::Database(format!("connection pool error: {err}"))
}

/// Map a blocking-task join error into the domain error type
pub fn map_join_error(err: JoinError) -> StrideError {
    if err.is_cancelled() {
        StrideError::Internal("blocking database task cancelled".into())
    } else {
        StrideError::Internal(format!("blocking database task failed: {err}"))
    }
}
