use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One prompted speaking exercise, as supplied by the catalogue.
///
/// Read-only to the session core. `time_secs` is the target recording
/// duration; a session is only playable for items where it is finite and
/// positive. Everything past `picture` is opaque metadata used by the
/// browsing/filter collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeItem {
    /// Globally unique, shaped `date_set_num`.
    pub id: String,
    pub date: i64,
    pub set: String,
    pub num: i64,
    #[serde(rename = "timeSec")]
    pub time_secs: f64,
    #[serde(default)]
    pub scene: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub difficulty: i64,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub script: String,
    /// Prompt audio reference; empty means no prompt track.
    #[serde(default)]
    pub audio: String,
    /// Optional picture reference; empty means none.
    #[serde(default)]
    pub picture: String,
}

impl PracticeItem {
    pub fn prompt_audio(&self) -> Option<&str> {
        non_empty(&self.audio)
    }

    pub fn picture_ref(&self) -> Option<&str> {
        non_empty(&self.picture)
    }

    /// Whether the configured duration can bound a recording.
    pub fn has_valid_duration(&self) -> bool {
        self.time_secs.is_finite() && self.time_secs > 0.0
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// The catalogue file: a versioned, ordered list of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub source: String,
    pub items: Vec<PracticeItem>,
}

/// Resolve a media reference against the media root.
///
/// Absolute paths pass through; references already prefixed with the folder
/// are not double-nested; everything else lands under `<root>/<folder>/`.
pub fn resolve_media_path(root: &Path, folder: &str, reference: &str) -> Option<PathBuf> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let as_path = Path::new(reference);
    if as_path.is_absolute() {
        return Some(as_path.to_path_buf());
    }
    if reference.starts_with(&format!("{}/", folder)) {
        return Some(root.join(reference));
    }
    Some(root.join(folder).join(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(time_secs: f64) -> PracticeItem {
        PracticeItem {
            id: "20240101_01_02".into(),
            date: 20240101,
            set: "A".into(),
            num: 2,
            time_secs,
            scene: String::new(),
            kind: "simple".into(),
            length: 0.0,
            difficulty: 1,
            prompt: String::new(),
            script: String::new(),
            audio: "q01.mp3".into(),
            picture: String::new(),
        }
    }

    #[test]
    fn duration_validity() {
        assert!(item(3.0).has_valid_duration());
        assert!(!item(0.0).has_valid_duration());
        assert!(!item(-1.0).has_valid_duration());
        assert!(!item(f64::NAN).has_valid_duration());
        assert!(!item(f64::INFINITY).has_valid_duration());
    }

    #[test]
    fn empty_references_are_absent() {
        let mut it = item(3.0);
        it.audio = "  ".into();
        assert!(it.prompt_audio().is_none());
        assert!(it.picture_ref().is_none());
    }

    #[test]
    fn media_paths_nest_under_their_folder_once() {
        let root = Path::new("/media");
        assert_eq!(
            resolve_media_path(root, "Audio", "q01.mp3"),
            Some(PathBuf::from("/media/Audio/q01.mp3"))
        );
        assert_eq!(
            resolve_media_path(root, "Audio", "Audio/q01.mp3"),
            Some(PathBuf::from("/media/Audio/q01.mp3"))
        );
        assert_eq!(resolve_media_path(root, "Audio", ""), None);
        assert_eq!(
            resolve_media_path(root, "Pic", "/abs/p.png"),
            Some(PathBuf::from("/abs/p.png"))
        );
    }

    #[test]
    fn legacy_type_field_maps_to_kind() {
        let raw = r#"{
            "id": "20240101_01_01",
            "date": 20240101,
            "set": "A",
            "num": 1,
            "timeSec": 45,
            "type": "compound",
            "audio": "a.mp3"
        }"#;
        let parsed: PracticeItem = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.kind, "compound");
        assert_eq!(parsed.time_secs, 45.0);
    }
}
