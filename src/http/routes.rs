use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/current", delete(handlers::end_session))
        // Practice flow
        .route("/sessions/current/status", get(handlers::get_status))
        .route("/sessions/current/play", post(handlers::play_prompt))
        .route("/sessions/current/pause", post(handlers::pause_prompt))
        .route("/sessions/current/position", get(handlers::prompt_position))
        .route("/sessions/current/begin", post(handlers::begin))
        .route("/sessions/current/next", post(handlers::next_item))
        .route("/sessions/current/previous", post(handlers::previous_item))
        .route("/sessions/current/redo", post(handlers::redo))
        // Recorded playback
        .route(
            "/sessions/current/recording/play",
            post(handlers::play_recording),
        )
        .route(
            "/sessions/current/recording/pause",
            post(handlers::pause_recording),
        )
        .route(
            "/sessions/current/recording/position",
            get(handlers::recording_position),
        )
        // Export boundary
        .route("/sessions/current/export", get(handlers::export_current))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
