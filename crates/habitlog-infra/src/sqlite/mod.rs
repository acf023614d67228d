//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod pool;
pub mod record;
pub mod user;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use habitlog_types::error::RepositoryError;

// ---------------------------------------------------------------------------
// Shared column helpers
// ---------------------------------------------------------------------------

/// Fixed-width UTC timestamp so that text comparison is chronological.
pub(crate) fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_utc(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn parse_local(s: &str) -> Result<DateTime<FixedOffset>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepositoryError::Query(format!("invalid local datetime: {e}")))
}

/// Pool exhaustion and I/O failures are connection problems; the rest are query errors.
pub(crate) fn map_sqlx(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}
