use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::catalogue::select_items;
use crate::session::SessionController;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Item identifiers the session should run through, from the selection UI.
    pub selected_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Transport position for either audio pill (prompt or recorded playback).
#[derive(Debug, Serialize)]
pub struct TransportPosition {
    pub elapsed_secs: f64,
    pub fraction: f64,
}

fn position_response(position: (f64, f64)) -> axum::response::Response {
    let (elapsed_secs, fraction) = position;
    (
        StatusCode::OK,
        Json(TransportPosition {
            elapsed_secs,
            fraction,
        }),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn active_session(state: &AppState) -> Option<Arc<SessionController>> {
    state.session.read().await.clone()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Start a practice session over the selected items.
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    // Held across the check and the install so two concurrent starts cannot
    // both pass the guard.
    let mut session = state.session.write().await;
    if session.is_some() {
        return error_response(StatusCode::CONFLICT, "A session is already active");
    }

    let queue = select_items(&state.catalogue, &req.selected_ids);
    if queue.is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Selection matches no catalogue items",
        );
    }

    let controller = match SessionController::new(
        queue,
        Arc::clone(&state.device),
        state.controller_config.clone(),
    )
    .await
    {
        Ok(controller) => Arc::new(controller),
        Err(e) => {
            error!("Failed to create session: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create session: {}", e),
            );
        }
    };

    let stats = controller.stats().await;
    *session = Some(controller);

    info!("Practice session started: {}", stats.session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id: stats.session_id,
            status: "active".to_string(),
            message: format!("Session started with {} items", stats.total),
        }),
    )
        .into_response()
}

/// DELETE /sessions/current
/// Tear the active session down.
pub async fn end_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut session = state.session.write().await;
        session.take()
    };

    match session {
        Some(controller) => {
            controller.shutdown().await;
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// GET /sessions/current/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => (StatusCode::OK, Json(controller.stats().await)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/play
/// Start prompt playback (or the manual trigger when no prompt exists).
pub async fn play_prompt(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            controller.play_prompt().await;
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/pause
/// Pause prompt playback.
pub async fn pause_prompt(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            controller.pause_prompt().await;
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// GET /sessions/current/position
/// Elapsed/fraction of the current prompt track.
pub async fn prompt_position(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => position_response(controller.prompt_position().await),
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/recording/play
/// Play back the current item's stored recording.
pub async fn play_recording(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            if !controller.play_recording().await {
                return error_response(StatusCode::CONFLICT, "No stored recording to play");
            }
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/recording/pause
pub async fn pause_recording(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            controller.pause_recording().await;
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// GET /sessions/current/recording/position
/// Elapsed/fraction of the recorded playback.
pub async fn recording_position(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => position_response(controller.recording_position().await),
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/begin
/// Manual trigger: move Idle -> PostPromptDelay without a prompt completion.
pub async fn begin(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            controller.begin().await;
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/next
pub async fn next_item(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            if !controller.next().await {
                return error_response(StatusCode::CONFLICT, "Already at the last item");
            }
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/previous
pub async fn previous_item(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            if !controller.previous().await {
                return error_response(StatusCode::CONFLICT, "Already at the first item");
            }
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// POST /sessions/current/redo
pub async fn redo(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            controller.redo().await;
            (StatusCode::OK, Json(controller.stats().await)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// GET /sessions/current/export
/// Download the current item's recording, or its fallback marker.
pub async fn export_current(State(state): State<AppState>) -> impl IntoResponse {
    match active_session(&state).await {
        Some(controller) => {
            let export = controller.export_current().await;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, export.mime.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", export.filename),
                    ),
                ],
                export.bytes,
            )
                .into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No active session"),
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
