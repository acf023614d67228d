//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use habitlog_types::error::HabitError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors raised by the logging core.
    Habit(HabitError),
    /// Malformed request outside the core (e.g. a non-numeric user id).
    Validation(String),
}

impl From<HabitError> for AppError {
    fn from(e: HabitError) -> Self {
        AppError::Habit(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::Habit(HabitError::ValidationFailed { field, .. }) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                Some(json!({ "field": field })),
            ),
            AppError::Habit(HabitError::NoActiveSession) => {
                (StatusCode::NOT_FOUND, "NO_ACTIVE_SESSION", None)
            }
            AppError::Habit(HabitError::SessionAlreadyActive) => {
                (StatusCode::CONFLICT, "SESSION_ALREADY_ACTIVE", None)
            }
            AppError::Habit(HabitError::CommitInProgress) => {
                (StatusCode::CONFLICT, "COMMIT_IN_PROGRESS", None)
            }
            AppError::Habit(HabitError::InvalidTimezone(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_TIMEZONE", None)
            }
            AppError::Habit(HabitError::NonexistentLocalTime(_)) => {
                (StatusCode::BAD_REQUEST, "NONEXISTENT_LOCAL_TIME", None)
            }
            AppError::Habit(HabitError::StorageUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", None)
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Habit(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, error = %self.message(), "request failed");
        } else {
            tracing::debug!(code, error = %self.message(), "request rejected");
        }

        (status, Json(ApiResponse::error(code, self.message(), details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitlog_types::error::Field;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn habit_errors_map_to_status_codes() {
        let validation = HabitError::ValidationFailed {
            field: Field::Rating,
            reason: "must be between 1 and 5".to_string(),
        };
        assert_eq!(status_of(validation.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(HabitError::NoActiveSession.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(HabitError::SessionAlreadyActive.into()), StatusCode::CONFLICT);
        assert_eq!(status_of(HabitError::CommitInProgress.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(HabitError::InvalidTimezone("Mars/Olympus".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(HabitError::StorageUnavailable("database connection error".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::Validation("invalid user id".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_failure_names_the_field() {
        let err = AppError::from(HabitError::ValidationFailed {
            field: Field::Consistency,
            reason: "must be one of: watery, thin, medium, thick, sticky".to_string(),
        });
        let (_, code, details) = err.parts();
        assert_eq!(code, "VALIDATION_ERROR");
        assert_eq!(details, Some(json!({ "field": "consistency" })));
        assert!(err.message().starts_with("invalid consistency"));
    }
}
