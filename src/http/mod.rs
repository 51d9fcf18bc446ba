//! HTTP API server for driving a practice session from a UI
//!
//! - POST   /sessions                           - Start a session over selected items
//! - DELETE /sessions/current                   - Tear the session down
//! - GET    /sessions/current/status            - Phase, position, per-item progress
//! - POST   /sessions/current/play              - Prompt playback / manual trigger
//! - POST   /sessions/current/pause             - Pause prompt playback
//! - GET    /sessions/current/position          - Prompt transport position
//! - POST   /sessions/current/begin             - Manual post-prompt delay trigger
//! - POST   /sessions/current/next              - Navigate forward
//! - POST   /sessions/current/previous          - Navigate back
//! - POST   /sessions/current/redo              - Discard and retry the current item
//! - POST   /sessions/current/recording/play    - Play the stored recording
//! - POST   /sessions/current/recording/pause   - Pause recorded playback
//! - GET    /sessions/current/recording/position - Recorded playback position
//! - GET    /sessions/current/export            - Download recording or fallback marker
//! - GET    /health                             - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
