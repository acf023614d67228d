//! REST API handler modules.

pub mod session;
pub mod stats;
pub mod timezone;

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use habitlog_types::user::UserId;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Parse the `{id}` path segment.
pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid user id: '{raw}'")))
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub version: &'static str,
    /// Stored sessions, including expired ones the reaper has not swept yet.
    pub sessions: usize,
}

/// GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthView>> {
    let started = Instant::now();
    let view = HealthView {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.len(),
    };
    Json(ApiResponse::success(view, started))
}
