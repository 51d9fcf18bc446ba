//! Practice session management
//!
//! This module provides the session core:
//! - `SessionController`: phase sequencing, delay/capture timers, navigation
//! - `RecordingStore`: per-item artifacts and revocable playable handles
//! - `SessionPhase` / `SessionStats`: state and progress reporting

mod controller;
mod phase;
mod store;

pub use controller::{ControllerConfig, SessionController};
pub use phase::{ItemProgress, SessionPhase, SessionStats};
pub use store::{HandleRegistry, ItemRecordingState, PlayableHandle, RecordingStore};
