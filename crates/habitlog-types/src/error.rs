use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

/// Input field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Rating,
    Duration,
    Amount,
    Consistency,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Rating => write!(f, "rating"),
            Field::Duration => write!(f, "duration"),
            Field::Amount => write!(f, "amount"),
            Field::Consistency => write!(f, "consistency"),
        }
    }
}

/// Errors surfaced by the logging core.
///
/// Every variant is a per-request, recoverable condition; none of them is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum HabitError {
    /// User input did not satisfy the constraint of the current step.
    /// The session stays at the same step.
    #[error("invalid {field}: {reason}")]
    ValidationFailed { field: Field, reason: String },

    /// No live session for the user (never started, completed, cancelled, or expired).
    #[error("no active session")]
    NoActiveSession,

    /// A session is already running and the restart policy rejects a new one.
    #[error("a session is already active")]
    SessionAlreadyActive,

    /// The session's record is being persisted by a concurrent request.
    #[error("record commit already in progress")]
    CommitInProgress,

    #[error("invalid timezone: '{0}'")]
    InvalidTimezone(String),

    /// The local wall-clock time falls into a daylight-saving gap.
    #[error("local time {0} does not exist in this timezone")]
    NonexistentLocalTime(NaiveDateTime),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Errors from repository operations (used by trait definitions in habitlog-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}

impl From<RepositoryError> for HabitError {
    fn from(e: RepositoryError) -> Self {
        HabitError::StorageUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = HabitError::ValidationFailed {
            field: Field::Rating,
            reason: "must be between 1 and 5".to_string(),
        };
        assert_eq!(err.to_string(), "invalid rating: must be between 1 and 5");
    }

    #[test]
    fn test_repository_error_maps_to_storage_unavailable() {
        let err: HabitError = RepositoryError::Query("disk I/O error".to_string()).into();
        assert!(matches!(err, HabitError::StorageUnavailable(ref m) if m.contains("disk I/O")));
    }

    #[test]
    fn test_connection_error_maps_to_storage_unavailable() {
        let err: HabitError = RepositoryError::Connection.into();
        assert_eq!(err.to_string(), "storage unavailable: database connection error");
    }

    #[test]
    fn test_field_serde() {
        let json = serde_json::to_string(&Field::Consistency).unwrap();
        assert_eq!(json, "\"consistency\"");
    }
}
