use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalogue::PracticeItem;
use crate::session::ItemRecordingState;

/// A single downloadable artifact: payload bytes plus a suggested name.
/// Delivery (local save, upload) is the caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Fallback acknowledgment for an item attempted without a usable recording
/// device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub done: bool,
}

/// Produce the export for one item: its recording when one exists, otherwise
/// the structured completion marker.
pub fn export_item(item: &PracticeItem, entry: Option<&ItemRecordingState>) -> Export {
    let file_base = format!("LR_{}", item.id);

    if let Some(artifact) = entry.and_then(|e| e.artifact()) {
        info!(
            "Exporting recording for {} ({} bytes)",
            item.id,
            artifact.bytes.len()
        );
        return Export {
            filename: format!("{}.{}", file_base, artifact.media_type.extension()),
            mime: artifact.media_type.mime(),
            bytes: artifact.bytes.clone(),
        };
    }

    let marker = CompletionMarker {
        id: item.id.clone(),
        timestamp: Utc::now(),
        done: true,
    };
    info!("Exporting completion marker for {}", item.id);
    Export {
        filename: format!("{}.json", file_base),
        mime: "application/json",
        bytes: serde_json::to_vec_pretty(&marker).unwrap_or_default(),
    }
}
