//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Users are addressed by their numeric
//! chat id. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Conversation
        .route(
            "/users/{id}/session",
            post(handlers::session::start_session)
                .get(handlers::session::get_session)
                .delete(handlers::session::cancel_session),
        )
        .route(
            "/users/{id}/session/input",
            post(handlers::session::submit_input),
        )
        // Stats
        .route(
            "/users/{id}/stats/{period}",
            get(handlers::stats::get_summary),
        )
        // Timezone
        .route(
            "/users/{id}/timezone",
            get(handlers::timezone::get_timezone).put(handlers::timezone::set_timezone),
        )
        .route("/timezones", get(handlers::timezone::list_timezones));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
