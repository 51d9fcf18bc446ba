use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-item phase of the practice flow. Exactly one item is current at a
/// time; the phase resets to `Idle` whenever the current item changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    PlayingPrompt,
    PostPromptDelay,
    Recording,
    Complete,
}

/// Read-only completion state for one item, for progress display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemProgress {
    pub id: String,
    /// A recording or fallback artifact exists for this item.
    pub complete: bool,
}

/// Snapshot of a running practice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub phase: SessionPhase,
    /// Position in the queue (0-based).
    pub index: usize,
    pub total: usize,
    pub current_item_id: String,
    pub prompt_available: bool,
    /// Status text for the current item, if a recoverable failure occurred.
    pub status: Option<String>,
    pub started_at: DateTime<Utc>,
    pub items: Vec<ItemProgress>,
}
