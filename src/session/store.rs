use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;
use uuid::Uuid;

use crate::audio::RecordingArtifact;

/// Registry of live playable handles, the in-process analogue of object URLs.
///
/// A handle makes a stored artifact playable until it is revoked. Revocation
/// happens synchronously inside the store operation that supersedes the
/// handle, so artifact lifetime stays deterministic.
#[derive(Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Arc<RecordingArtifact>>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, artifact: Arc<RecordingArtifact>) -> PlayableHandle {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().insert(id, artifact);
        PlayableHandle {
            id,
            registry: self.clone(),
        }
    }

    fn revoke(&self, id: Uuid) {
        if self.inner.lock().unwrap().remove(&id).is_some() {
            debug!("Revoked playable handle {}", id);
        }
    }

    /// Look a handle up for playback.
    pub fn resolve(&self, id: Uuid) -> Option<Arc<RecordingArtifact>> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    pub fn live_handles(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// A revocable reference allowing a stored artifact to be played back.
pub struct PlayableHandle {
    id: Uuid,
    registry: HandleRegistry,
}

impl PlayableHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn revoke(self) {
        self.registry.revoke(self.id);
    }
}

/// Per-item recording state, created lazily on first visit.
#[derive(Default)]
pub struct ItemRecordingState {
    artifact: Option<Arc<RecordingArtifact>>,
    handle: Option<PlayableHandle>,
    capture_unavailable: bool,
}

impl ItemRecordingState {
    pub fn artifact(&self) -> Option<&Arc<RecordingArtifact>> {
        self.artifact.as_ref()
    }

    pub fn handle_id(&self) -> Option<Uuid> {
        self.handle.as_ref().map(PlayableHandle::id)
    }

    /// Capture was attempted for this item but no usable device existed.
    pub fn capture_unavailable(&self) -> bool {
        self.capture_unavailable
    }

    /// The item counts as done: either a recording or the fallback flag.
    pub fn is_complete(&self) -> bool {
        self.artifact.is_some() || self.capture_unavailable
    }
}

/// Owner of every item's recording artifact and playable handle for the life
/// of a session. In-memory only; nothing survives a restart.
pub struct RecordingStore {
    registry: HandleRegistry,
    entries: HashMap<String, ItemRecordingState>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
            entries: HashMap::new(),
        }
    }

    /// Return-or-create the per-item state.
    pub fn entry(&mut self, item_id: &str) -> &mut ItemRecordingState {
        self.entries.entry(item_id.to_string()).or_default()
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemRecordingState> {
        self.entries.get(item_id)
    }

    /// Install a new artifact, revoking the superseded handle in the same
    /// operation. Two live handles never coexist for one item.
    pub fn replace(&mut self, item_id: &str, artifact: RecordingArtifact) {
        let registry = self.registry.clone();
        let entry = self.entry(item_id);

        if let Some(old) = entry.handle.take() {
            old.revoke();
        }

        let artifact = Arc::new(artifact);
        entry.handle = Some(registry.register(Arc::clone(&artifact)));
        entry.artifact = Some(artifact);
        entry.capture_unavailable = false;
    }

    /// Drop the artifact and revoke its handle; the unavailable flag resets
    /// so a retry is tracked cleanly.
    pub fn clear(&mut self, item_id: &str) {
        if let Some(entry) = self.entries.get_mut(item_id) {
            if let Some(handle) = entry.handle.take() {
                handle.revoke();
            }
            entry.artifact = None;
            entry.capture_unavailable = false;
        }
    }

    pub fn mark_unavailable(&mut self, item_id: &str) {
        self.entry(item_id).capture_unavailable = true;
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}
