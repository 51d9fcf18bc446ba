use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::track::Track;

/// Completion events from a scrubber, one per play-through that reaches the
/// end of the track.
pub type CompletionEvents = mpsc::UnboundedReceiver<()>;

/// Transport over one playable track: play/pause, seek by fraction, elapsed
/// reporting, and a single completion event when playback reaches the end.
///
/// With no track set, play is a no-op and seeking is disabled. Playback is
/// clock-driven; the end-of-track trigger is a cancellable spawned sleep.
pub struct AudioScrubber {
    inner: Arc<Mutex<ScrubberInner>>,
    completion_tx: mpsc::UnboundedSender<()>,
}

struct ScrubberInner {
    track: Option<Track>,
    playing: bool,
    played_since: Option<Instant>,
    base_elapsed: f64,
    completed: bool,
    generation: u64,
    end_task: Option<JoinHandle<()>>,
}

impl AudioScrubber {
    pub fn new(track: Option<Track>) -> (Self, CompletionEvents) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let scrubber = Self {
            inner: Arc::new(Mutex::new(ScrubberInner {
                track,
                playing: false,
                played_since: None,
                base_elapsed: 0.0,
                completed: false,
                generation: 0,
                end_task: None,
            })),
            completion_tx,
        };
        (scrubber, completion_rx)
    }

    /// Whether a playable track is loaded.
    pub fn available(&self) -> bool {
        self.inner.lock().unwrap().track.is_some()
    }

    /// Start (or resume) playback. No-op without a track, while already
    /// playing, or after completion until a seek re-arms the transport.
    pub fn play(&self) {
        let mut inner = self.inner.lock().unwrap();
        let Some(track) = inner.track else { return };
        if inner.playing || inner.completed {
            return;
        }

        inner.playing = true;
        inner.played_since = Some(Instant::now());

        let remaining = (track.duration_secs - inner.base_elapsed).max(0.0);
        self.arm_end_task(&mut inner, remaining);
    }

    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.playing {
            return;
        }
        if let Some(since) = inner.played_since.take() {
            inner.base_elapsed += since.elapsed().as_secs_f64();
        }
        inner.playing = false;
        Self::disarm(&mut inner);
    }

    /// Seek to a fraction of the track. Returns false when seeking is
    /// disabled (no track). A seek below the end re-arms completion.
    pub fn seek_to_fraction(&self, fraction: f64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(track) = inner.track else { return false };

        let fraction = fraction.clamp(0.0, 1.0);
        inner.base_elapsed = fraction * track.duration_secs;
        if fraction < 1.0 {
            inner.completed = false;
        }

        if inner.playing {
            inner.played_since = Some(Instant::now());
            let remaining = (track.duration_secs - inner.base_elapsed).max(0.0);
            self.arm_end_task(&mut inner, remaining);
        }
        true
    }

    /// Elapsed seconds and fraction complete.
    pub fn position(&self) -> (f64, f64) {
        let inner = self.inner.lock().unwrap();
        let Some(track) = inner.track else {
            return (0.0, 0.0);
        };

        let mut elapsed = inner.base_elapsed;
        if let Some(since) = inner.played_since {
            elapsed += since.elapsed().as_secs_f64();
        }
        let elapsed = elapsed.min(track.duration_secs);
        let fraction = if track.duration_secs > 0.0 {
            elapsed / track.duration_secs
        } else {
            0.0
        };
        (elapsed, fraction)
    }

    /// Halt playback and any pending end-of-track trigger.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.playing = false;
        inner.played_since = None;
        Self::disarm(&mut inner);
    }

    fn arm_end_task(&self, inner: &mut ScrubberInner, remaining_secs: f64) {
        Self::disarm(inner);

        let generation = inner.generation;
        let state = Arc::clone(&self.inner);
        let tx = self.completion_tx.clone();

        inner.end_task = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(remaining_secs)).await;

            let mut inner = state.lock().unwrap();
            if inner.generation != generation || !inner.playing {
                return;
            }
            if let Some(track) = inner.track {
                inner.base_elapsed = track.duration_secs;
            }
            inner.playing = false;
            inner.played_since = None;
            if !inner.completed {
                inner.completed = true;
                let _ = tx.send(());
            }
        }));
    }

    fn disarm(inner: &mut ScrubberInner) {
        inner.generation += 1;
        if let Some(task) = inner.end_task.take() {
            task.abort();
        }
    }
}

impl Drop for AudioScrubber {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            Self::disarm(&mut inner);
        }
    }
}
