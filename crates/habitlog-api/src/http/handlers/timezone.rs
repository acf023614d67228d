//! Timezone preference handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use habitlog_core::timezone::{TimezoneOption, presets, timezone_label};

use super::parse_user_id;
use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TimezoneView {
    /// Canonical IANA identifier.
    pub timezone: String,
    /// `UTC+9` style label for preset zones, otherwise the identifier.
    pub label: String,
}

impl From<Tz> for TimezoneView {
    fn from(tz: Tz) -> Self {
        Self {
            timezone: tz.name().to_string(),
            label: timezone_label(tz.name()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetTimezoneRequest {
    pub timezone: String,
}

/// GET /api/v1/users/{id}/timezone - Effective timezone (stored or default).
pub async fn get_timezone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TimezoneView>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;

    let tz = state.timezones.resolve(user_id).await?;

    Ok(Json(ApiResponse::success(TimezoneView::from(tz), started)))
}

/// PUT /api/v1/users/{id}/timezone - Validate and store a timezone.
pub async fn set_timezone(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetTimezoneRequest>,
) -> Result<Json<ApiResponse<TimezoneView>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;

    let tz = state.timezones.set(user_id, &body.timezone).await?;

    let resp = ApiResponse::success(TimezoneView::from(tz), started)
        .with_link("stats", format!("/api/v1/users/{id}/stats/week"));
    Ok(Json(resp))
}

/// GET /api/v1/timezones - Preset `UTC-12` .. `UTC+14` choices.
pub async fn list_timezones() -> Json<ApiResponse<Vec<TimezoneOption>>> {
    let started = Instant::now();
    Json(ApiResponse::success(presets(), started))
}
