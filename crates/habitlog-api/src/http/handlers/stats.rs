//! Statistics handlers for the REST API.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};

use habitlog_types::stats::{StatsPeriod, Summary};

use super::parse_user_id;
use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/users/{id}/stats/{period} - Weekly or monthly summary.
///
/// `period` is `week` or `month` (`weekly` / `monthly` also accepted).
pub async fn get_summary(
    State(state): State<AppState>,
    Path((id, period)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Summary>>, AppError> {
    let started = Instant::now();
    let user_id = parse_user_id(&id)?;
    let period: StatsPeriod = period.parse().map_err(AppError::Validation)?;

    let now = state.clock.now();
    let summary = match period {
        StatsPeriod::Week => state.stats.weekly(user_id, now).await?,
        StatsPeriod::Month => state.stats.monthly(user_id, now).await?,
    };

    let resp = ApiResponse::success(summary, started)
        .with_link("self", format!("/api/v1/users/{id}/stats/{period}"))
        .with_link("timezone", format!("/api/v1/users/{id}/timezone"));
    Ok(Json(resp))
}
