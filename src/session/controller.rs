use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audio::{AudioScrubber, CaptureDevice, CaptureOutcome, Track};
use crate::catalogue::{resolve_media_path, PracticeItem};
use crate::error::SessionError;
use crate::export::{export_item, Export};

use super::phase::{ItemProgress, SessionPhase, SessionStats};
use super::store::RecordingStore;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Directory containing the Audio/ and Pic/ media folders.
    pub media_root: PathBuf,
    /// Fixed pause between prompt end and recording start.
    pub post_prompt_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("."),
            post_prompt_delay: Duration::from_secs(2),
        }
    }
}

/// The practice session state machine.
///
/// Sequences, per item: prompt playback, the fixed post-prompt delay, the
/// duration-bounded capture window, and artifact storage; exposes navigation
/// and redo. All timers are cancellable spawned tasks; a generation counter
/// bumped on every teardown keeps stale fires from touching the new step.
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    session_id: String,
    device: Arc<CaptureDevice>,
    config: ControllerConfig,
    started_at: DateTime<Utc>,
    state: Mutex<State>,
}

struct State {
    queue: Vec<PracticeItem>,
    index: usize,
    phase: SessionPhase,
    store: RecordingStore,
    scrubber: AudioScrubber,
    review: AudioScrubber,
    review_handle: Option<Uuid>,
    prompt_available: bool,
    status: Option<SessionError>,
    epoch: u64,
    pending_delay: Option<JoinHandle<()>>,
    prompt_listener: Option<JoinHandle<()>>,
    capture_cancel: Option<Arc<Notify>>,
}

impl SessionController {
    /// Build a session over an immutable queue, starting at the first item.
    pub async fn new(
        queue: Vec<PracticeItem>,
        device: Arc<CaptureDevice>,
        config: ControllerConfig,
    ) -> Result<Self> {
        anyhow::ensure!(!queue.is_empty(), "Session queue is empty");

        let session_id = format!("practice-{}", Uuid::new_v4());
        info!("Creating practice session: {} ({} items)", session_id, queue.len());

        let (scrubber, _events) = AudioScrubber::new(None);
        let (review, _review_events) = AudioScrubber::new(None);
        let inner = Arc::new(Inner {
            session_id,
            device,
            config,
            started_at: Utc::now(),
            state: Mutex::new(State {
                queue,
                index: 0,
                phase: SessionPhase::Idle,
                store: RecordingStore::new(),
                scrubber,
                review,
                review_handle: None,
                prompt_available: false,
                status: None,
                epoch: 0,
                pending_delay: None,
                prompt_listener: None,
                capture_cancel: None,
            }),
        });

        {
            let mut state = inner.state.lock().await;
            Inner::enter_current(&inner, &mut state);
        }

        Ok(Self { inner })
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.lock().await.phase
    }

    pub async fn current_item(&self) -> PracticeItem {
        let state = self.inner.state.lock().await;
        state.queue[state.index].clone()
    }

    /// The item identifiers this session was constructed with, in order.
    pub async fn item_ids(&self) -> Vec<String> {
        let state = self.inner.state.lock().await;
        state.queue.iter().map(|i| i.id.clone()).collect()
    }

    pub async fn status(&self) -> Option<SessionError> {
        self.inner.state.lock().await.status.clone()
    }

    /// Whether the current item's prompt track loaded and can drive the flow.
    pub async fn prompt_available(&self) -> bool {
        self.inner.state.lock().await.prompt_available
    }

    /// Elapsed seconds and fraction of the current prompt track.
    pub async fn prompt_position(&self) -> (f64, f64) {
        self.inner.state.lock().await.scrubber.position()
    }

    /// Start prompt playback. Without a playable prompt this acts as the
    /// manual trigger and moves straight to the post-prompt delay.
    pub async fn play_prompt(&self) {
        let mut state = self.inner.state.lock().await;
        if state.prompt_available {
            if matches!(state.phase, SessionPhase::Idle | SessionPhase::PlayingPrompt) {
                state.phase = SessionPhase::PlayingPrompt;
                state.scrubber.play();
            }
        } else {
            Inner::begin_locked(&self.inner, &mut state);
        }
    }

    pub async fn pause_prompt(&self) {
        let mut state = self.inner.state.lock().await;
        state.scrubber.pause();
        if state.phase == SessionPhase::PlayingPrompt {
            state.phase = SessionPhase::Idle;
        }
    }

    /// Play back the current item's stored recording through the review
    /// transport. Returns false when no recording exists for the item or the
    /// artifact cannot be decoded.
    pub async fn play_recording(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        let item_id = state.queue[state.index].id.clone();
        let Some(handle) = state.store.get(&item_id).and_then(|e| e.handle_id()) else {
            return false;
        };

        if state.review_handle != Some(handle) {
            let Some(artifact) = state.store.registry().resolve(handle) else {
                return false;
            };
            let track = match Track::from_wav_bytes(&artifact.bytes) {
                Ok(track) => track,
                Err(_) => {
                    warn!("Stored recording for {} is not playable", item_id);
                    return false;
                }
            };
            let (review, _events) = AudioScrubber::new(Some(track));
            state.review = review;
            state.review_handle = Some(handle);
        }

        // Replaying after the end restarts from the beginning.
        if state.review.position().1 >= 1.0 {
            state.review.seek_to_fraction(0.0);
        }
        state.review.play();
        true
    }

    pub async fn pause_recording(&self) {
        self.inner.state.lock().await.review.pause();
    }

    /// Elapsed seconds and fraction of the recorded playback.
    pub async fn recording_position(&self) -> (f64, f64) {
        self.inner.state.lock().await.review.position()
    }

    /// Manual trigger for the post-prompt delay (no prompt, or load failed).
    pub async fn begin(&self) {
        let mut state = self.inner.state.lock().await;
        Inner::begin_locked(&self.inner, &mut state);
    }

    /// Advance to the next item. Returns false at the end of the queue.
    pub async fn next(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.index + 1 >= state.queue.len() {
            return false;
        }
        state.index += 1;
        Inner::enter_current(&self.inner, &mut state);
        true
    }

    /// Go back one item. Returns false at the start of the queue.
    pub async fn previous(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.index == 0 {
            return false;
        }
        state.index -= 1;
        Inner::enter_current(&self.inner, &mut state);
        true
    }

    /// Discard the current item's recording and restart its flow: replay the
    /// prompt when one exists, otherwise re-enter the delay immediately.
    pub async fn redo(&self) {
        let mut state = self.inner.state.lock().await;
        let item_id = state.queue[state.index].id.clone();
        info!("Redo requested for item {}", item_id);

        state.store.clear(&item_id);
        Inner::enter_current(&self.inner, &mut state);

        if state.prompt_available {
            state.phase = SessionPhase::PlayingPrompt;
            state.scrubber.play();
        } else {
            Inner::begin_locked(&self.inner, &mut state);
        }
    }

    /// Downloadable artifact (or fallback marker) for the current item.
    pub async fn export_current(&self) -> Export {
        let state = self.inner.state.lock().await;
        let item = &state.queue[state.index];
        export_item(item, state.store.get(&item.id))
    }

    pub async fn stats(&self) -> SessionStats {
        let state = self.inner.state.lock().await;
        let items = state
            .queue
            .iter()
            .map(|item| ItemProgress {
                id: item.id.clone(),
                complete: state
                    .store
                    .get(&item.id)
                    .map(|entry| entry.is_complete())
                    .unwrap_or(false),
            })
            .collect();

        SessionStats {
            session_id: self.inner.session_id.clone(),
            phase: state.phase,
            index: state.index,
            total: state.queue.len(),
            current_item_id: state.queue[state.index].id.clone(),
            prompt_available: state.prompt_available,
            status: state.status.as_ref().map(|e| e.to_string()),
            started_at: self.inner.started_at,
            items,
        }
    }

    /// Number of live playable handles, across all items.
    pub async fn live_handles(&self) -> usize {
        self.inner.state.lock().await.store.registry().live_handles()
    }

    /// Playable handle for the current item's stored recording, if any.
    pub async fn current_handle(&self) -> Option<Uuid> {
        let state = self.inner.state.lock().await;
        let item_id = &state.queue[state.index].id;
        state.store.get(item_id).and_then(|entry| entry.handle_id())
    }

    /// Tear the session down, cancelling anything in flight and releasing
    /// the capture device.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().await;
            Inner::teardown_locked(&mut state);
        }
        self.inner.device.release().await;
        info!("Practice session closed: {}", self.inner.session_id);
    }
}

impl Inner {
    /// Reset the flow for the current item: cancel whatever the previous
    /// step left pending, reload the prompt track, re-arm the listener.
    fn enter_current(self: &Arc<Self>, state: &mut State) {
        Self::teardown_locked(state);

        let item = state.queue[state.index].clone();
        state.store.entry(&item.id);

        info!(
            "Item {}/{}: {} (timeSec={})",
            state.index + 1,
            state.queue.len(),
            item.id,
            item.time_secs
        );

        let track = item.prompt_audio().and_then(|reference| {
            let path = resolve_media_path(&self.config.media_root, "Audio", reference)?;
            match Track::probe_file(&path) {
                Ok(track) => Some(track),
                Err(_) => {
                    warn!("Prompt failed to load for {}: {}", item.id, path.display());
                    state.status = Some(SessionError::PromptLoadFailure);
                    None
                }
            }
        });

        state.prompt_available = track.is_some();
        let (scrubber, mut events) = AudioScrubber::new(track);
        state.scrubber = scrubber;
        let (review, _review_events) = AudioScrubber::new(None);
        state.review = review;
        state.review_handle = None;

        if state.prompt_available {
            let epoch = state.epoch;
            let inner = Arc::clone(self);
            state.prompt_listener = Some(tokio::spawn(async move {
                while events.recv().await.is_some() {
                    inner.on_prompt_complete(epoch).await;
                }
            }));
        }

        // An unusable duration is visible as soon as the item is entered.
        if !item.has_valid_duration() {
            state.status = Some(SessionError::InvalidDuration {
                secs: item.time_secs,
            });
        }
    }

    /// Cancel the previous logical step before the next one starts: pending
    /// delay timer, in-flight capture, prompt listener, scrubber transport.
    fn teardown_locked(state: &mut State) {
        state.epoch += 1;
        if let Some(handle) = state.pending_delay.take() {
            handle.abort();
        }
        if let Some(cancel) = state.capture_cancel.take() {
            cancel.notify_one();
        }
        if let Some(listener) = state.prompt_listener.take() {
            listener.abort();
        }
        state.scrubber.stop();
        state.review.stop();
        state.phase = SessionPhase::Idle;
        state.status = None;
    }

    async fn on_prompt_complete(self: &Arc<Self>, epoch: u64) {
        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            return;
        }
        info!("Prompt complete, scheduling post-prompt delay");
        Self::begin_locked(self, &mut state);
    }

    /// Schedule the fixed post-prompt delay, then recording. At most one
    /// delay timer is pending; scheduling replaces any previous one.
    fn begin_locked(self: &Arc<Self>, state: &mut State) {
        if matches!(
            state.phase,
            SessionPhase::PostPromptDelay | SessionPhase::Recording
        ) {
            return;
        }

        let item = &state.queue[state.index];
        if !item.has_valid_duration() {
            state.status = Some(SessionError::InvalidDuration {
                secs: item.time_secs,
            });
            warn!("Refusing to record {}: invalid duration", item.id);
            return;
        }

        state.scrubber.stop();
        state.review.stop();
        state.phase = SessionPhase::PostPromptDelay;
        state.status = None;

        let epoch = state.epoch;
        let delay = self.config.post_prompt_delay;
        let inner = Arc::clone(self);

        if let Some(previous) = state.pending_delay.take() {
            previous.abort();
        }
        state.pending_delay = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.start_recording(epoch).await;
        }));
    }

    /// Enter `Recording`: open a duration-bounded capture window and store
    /// the artifact when the window closes normally. Every resumption point
    /// re-checks the epoch so an abandoned attempt never stores anything.
    async fn start_recording(self: Arc<Self>, epoch: u64) {
        let duration = {
            let mut state = self.state.lock().await;
            if state.epoch != epoch {
                return;
            }
            state.pending_delay = None;
            state.phase = SessionPhase::Recording;
            Duration::from_secs_f64(state.queue[state.index].time_secs)
        };

        match self.device.start_capture(duration).await {
            Ok(window) => {
                let cancel = window.cancel_token();
                {
                    let mut state = self.state.lock().await;
                    if state.epoch != epoch {
                        window.cancel();
                        return;
                    }
                    if let Some(stale) = state.capture_cancel.replace(cancel) {
                        stale.notify_one();
                    }
                }

                let outcome = window.wait().await;

                let mut state = self.state.lock().await;
                if state.epoch != epoch {
                    return;
                }
                state.capture_cancel = None;
                let item_id = state.queue[state.index].id.clone();

                match outcome {
                    Ok(CaptureOutcome::Completed(artifact)) => {
                        state.store.replace(&item_id, artifact);
                        state.phase = SessionPhase::Complete;
                        info!("Recording stored for {}", item_id);
                    }
                    Ok(CaptureOutcome::Cancelled) => {
                        // Interrupted capture is abandoned, not saved.
                    }
                    Err(error) => {
                        // A previous artifact, if any, is preserved.
                        let has_artifact = state
                            .store
                            .get(&item_id)
                            .map(|entry| entry.artifact().is_some())
                            .unwrap_or(false);
                        if !has_artifact {
                            state.store.mark_unavailable(&item_id);
                        }
                        state.status = Some(error);
                        state.phase = SessionPhase::Complete;
                    }
                }
            }
            Err(error) => {
                // No capture capability. The item still completes after its
                // duration so the session continues uninterrupted.
                {
                    let mut state = self.state.lock().await;
                    if state.epoch != epoch {
                        return;
                    }
                    let item_id = state.queue[state.index].id.clone();
                    state.store.mark_unavailable(&item_id);
                    state.status = Some(error);
                }

                tokio::time::sleep(duration).await;

                let mut state = self.state.lock().await;
                if state.epoch != epoch {
                    return;
                }
                state.phase = SessionPhase::Complete;
            }
        }
    }
}
