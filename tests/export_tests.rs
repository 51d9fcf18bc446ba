// Integration tests for the export surface: artifact downloads and the
// fallback completion marker.

use speakdrill::audio::{MediaType, RecordingArtifact};
use speakdrill::catalogue::PracticeItem;
use speakdrill::export::{export_item, CompletionMarker};
use speakdrill::session::RecordingStore;

fn item(id: &str) -> PracticeItem {
    PracticeItem {
        id: id.to_string(),
        date: 20240101,
        set: "A".to_string(),
        num: 1,
        time_secs: 30.0,
        scene: String::new(),
        kind: "simple".to_string(),
        length: 0.0,
        difficulty: 1,
        prompt: String::new(),
        script: String::new(),
        audio: String::new(),
        picture: String::new(),
    }
}

#[test]
fn stored_recording_exports_as_audio() {
    let mut store = RecordingStore::new();
    store.replace(
        "20240101_01_02",
        RecordingArtifact {
            bytes: vec![1, 2, 3, 4],
            media_type: MediaType::WavPcm,
        },
    );

    let export = export_item(&item("20240101_01_02"), store.get("20240101_01_02"));
    assert_eq!(export.filename, "LR_20240101_01_02.wav");
    assert_eq!(export.mime, "audio/wav");
    assert_eq!(export.bytes, vec![1, 2, 3, 4]);
}

#[test]
fn missing_recording_exports_the_completion_marker() {
    let mut store = RecordingStore::new();
    store.mark_unavailable("20240101_01_02");

    let export = export_item(&item("20240101_01_02"), store.get("20240101_01_02"));
    assert_eq!(export.filename, "LR_20240101_01_02.json");
    assert_eq!(export.mime, "application/json");

    let marker: CompletionMarker = serde_json::from_slice(&export.bytes).unwrap();
    assert_eq!(marker.id, "20240101_01_02");
    assert!(marker.done);
    // The timestamp round-trips through serde as RFC 3339.
    let value: serde_json::Value = serde_json::from_slice(&export.bytes).unwrap();
    assert!(value["timestamp"].as_str().unwrap().contains('T'));
}

#[test]
fn never_visited_item_also_gets_the_marker() {
    let store = RecordingStore::new();
    let export = export_item(&item("fresh"), store.get("fresh"));
    assert_eq!(export.filename, "LR_fresh.json");
    assert_eq!(export.mime, "application/json");
}
