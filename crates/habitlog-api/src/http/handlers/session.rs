//! Logging session handlers for the REST API.
//!
//! One handler per conversation operation: start, submit, cancel, plus a
//! read-only view of the current session.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use habitlog_core::conversation::StepOutcome;
use habitlog_types::error::{Field, HabitError};
use habitlog_types::record::Record;
use habitlog_types::session::{Session, Step};

use super::parse_user_id;
use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// A session plus the field the next input will be validated as.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub expected: Option<Field>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        let expected = session.step.field();
        Self { session, expected }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitInputRequest {
    pub input: String,
}

/// Result of one submitted input.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitView {
    Advanced { step: Step, expected: Option<Field> },
    Completed { record: Record },
}

impl From<StepOutcome> for SubmitView {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Advanced { step } => SubmitView::Advanced {
                step,
                expected: step.field(),
            },
            StepOutcome::Completed { record } => SubmitView::Completed { record },
        }
    }
}

fn session_href(user: &str) -> String {
    format!("/api/v1/users/{user}/session")
}

/// POST /api/v1/users/{id}/session - Start (or restart) a logging session.
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;

    let session = state.conversation.start(user_id)?;

    let resp = ApiResponse::success(SessionView::from(session), started)
        .with_link("self", session_href(&id))
        .with_link("input", format!("{}/input", session_href(&id)));
    Ok(Json(resp))
}

/// GET /api/v1/users/{id}/session - Current live session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;

    let session = state
        .conversation
        .current(user_id)
        .ok_or(HabitError::NoActiveSession)?;

    let resp = ApiResponse::success(SessionView::from(session), started)
        .with_link("self", session_href(&id));
    Ok(Json(resp))
}

/// POST /api/v1/users/{id}/session/input - Submit the answer to the current step.
pub async fn submit_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitInputRequest>,
) -> Result<Json<ApiResponse<SubmitView>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;

    let outcome = state.conversation.submit(user_id, &body.input).await?;
    let completed = matches!(outcome, StepOutcome::Completed { .. });

    let mut resp = ApiResponse::success(SubmitView::from(outcome), started);
    resp = if completed {
        resp.with_link("stats", format!("/api/v1/users/{id}/stats/week"))
    } else {
        resp.with_link("input", format!("{}/input", session_href(&id)))
    };
    Ok(Json(resp))
}

/// DELETE /api/v1/users/{id}/session - Cancel the current session.
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;

    let session = state.conversation.cancel(user_id)?;

    Ok(Json(ApiResponse::success(SessionView::from(session), started)))
}
