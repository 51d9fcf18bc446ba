use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, Mutex, Notify, OnceCell, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::SessionError;

use super::encode::{assemble_artifact, negotiate_media_type, MediaType};

/// Audio sample data (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// The binary result of a completed capture, tagged with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

/// How a capture window ended.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The duration bound elapsed and the artifact was assembled.
    Completed(RecordingArtifact),
    /// An explicit cancel landed first; whatever was captured is abandoned.
    Cancelled,
}

/// Capture backend trait
///
/// Implementations:
/// - cpal: real microphone input on a dedicated thread (cpal streams are !Send)
/// - unavailable: environments with no capture capability
/// - scripted backends in tests, so capability absence needs no hardware
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request access to the input device. Permission denial and device
    /// absence both surface as `DeviceUnavailable`.
    async fn acquire(&mut self) -> Result<(), SessionError>;

    /// Begin streaming audio frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError>;

    /// Stop streaming and release the input stream.
    async fn stop(&mut self) -> Result<(), SessionError>;

    /// Encodings this backend can deliver, best first.
    fn advertised_media_types(&self) -> Vec<MediaType>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Session-wide holder of the microphone.
///
/// Acquisition happens lazily on first need and exactly once per session: a
/// second caller while acquisition is in flight awaits the first attempt
/// instead of issuing a duplicate permission request, and the outcome
/// (including denial) is reused for the rest of the session.
pub struct CaptureDevice {
    backend: Arc<Mutex<Box<dyn CaptureBackend>>>,
    acquired: OnceCell<Result<(), SessionError>>,
    acquire_attempts: AtomicUsize,
}

impl CaptureDevice {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend: Arc::new(Mutex::new(backend)),
            acquired: OnceCell::new(),
            acquire_attempts: AtomicUsize::new(0),
        })
    }

    /// Acquire the input handle, reusing a prior outcome if one exists.
    pub async fn acquire(&self) -> Result<(), SessionError> {
        self.acquired
            .get_or_init(|| async {
                self.acquire_attempts.fetch_add(1, Ordering::SeqCst);
                let mut backend = self.backend.lock().await;
                let result = backend.acquire().await;
                match &result {
                    Ok(()) => info!("Capture device acquired: {}", backend.name()),
                    Err(e) => warn!("Capture device unavailable ({}): {}", backend.name(), e),
                }
                result
            })
            .await
            .clone()
    }

    /// How many times the underlying backend was actually asked for access.
    pub fn acquire_attempts(&self) -> usize {
        self.acquire_attempts.load(Ordering::SeqCst)
    }

    /// Start a duration-bounded capture window.
    ///
    /// The window stops itself when `duration` elapses; the bound is
    /// authoritative, not advisory. An explicit cancel stops it early and
    /// abandons the attempt.
    ///
    /// Windows are serialized: the window task holds the backend lock until
    /// it has stopped its own stream, so a superseded window can never tear
    /// down a successor's stream.
    pub async fn start_capture(
        self: &Arc<Self>,
        duration: Duration,
    ) -> Result<CaptureWindow, SessionError> {
        self.acquire().await?;

        // Waits for any previous window to finish stopping.
        let mut backend = Arc::clone(&self.backend).lock_owned().await;
        let frames_rx = backend.start().await?;
        let media_type = negotiate_media_type(&backend.advertised_media_types());
        info!(
            "Capture started: {} ({:.1}s, {})",
            backend.name(),
            duration.as_secs_f64(),
            media_type.mime()
        );

        let cancel = Arc::new(Notify::new());
        let task = tokio::spawn(run_capture_window(
            frames_rx,
            duration,
            media_type,
            Arc::clone(&cancel),
            backend,
        ));

        Ok(CaptureWindow { cancel, task })
    }

    /// Tear the device down at end of session.
    pub async fn release(&self) {
        let mut backend = self.backend.lock().await;
        if let Err(e) = backend.stop().await {
            warn!("Failed to stop capture backend on release: {}", e);
        }
    }
}

/// An in-flight, cancellable capture bounded by the item's target duration.
pub struct CaptureWindow {
    cancel: Arc<Notify>,
    task: JoinHandle<Result<CaptureOutcome, SessionError>>,
}

impl CaptureWindow {
    /// Token that stops the window early when notified.
    pub fn cancel_token(&self) -> Arc<Notify> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// Wait for the window to close and yield its outcome.
    pub async fn wait(self) -> Result<CaptureOutcome, SessionError> {
        self.task
            .await
            .map_err(|_| SessionError::CaptureAssemblyFailure)?
    }
}

async fn run_capture_window(
    mut frames_rx: mpsc::Receiver<AudioFrame>,
    duration: Duration,
    media_type: MediaType,
    cancel: Arc<Notify>,
    mut backend: OwnedMutexGuard<Box<dyn CaptureBackend>>,
) -> Result<CaptureOutcome, SessionError> {
    let deadline = tokio::time::Instant::now() + duration;
    let mut frames: Vec<AudioFrame> = Vec::new();
    let mut cancelled = false;

    loop {
        tokio::select! {
            _ = cancel.notified() => {
                cancelled = true;
                break;
            }
            _ = tokio::time::sleep_until(deadline) => {
                break;
            }
            maybe_frame = frames_rx.recv() => {
                match maybe_frame {
                    Some(frame) => frames.push(frame),
                    None => {
                        // Stream ended early; the window stays open until the
                        // duration bound so completion timing is unchanged.
                        tokio::select! {
                            _ = cancel.notified() => cancelled = true,
                            _ = tokio::time::sleep_until(deadline) => {}
                        }
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = backend.stop().await {
        warn!("Failed to stop capture backend: {}", e);
    }
    drop(backend);

    if cancelled {
        info!("Capture cancelled before the duration bound");
        return Ok(CaptureOutcome::Cancelled);
    }

    let bytes = assemble_artifact(&frames, media_type)?;
    info!(
        "Capture complete: {} frames, {} bytes ({})",
        frames.len(),
        bytes.len(),
        media_type.mime()
    );

    Ok(CaptureOutcome::Completed(RecordingArtifact { bytes, media_type }))
}

// ============================================================================
// Backends
// ============================================================================

/// Real microphone input via cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated worker thread
/// that forwards converted frames over a channel and exits when flagged.
pub struct MicrophoneBackend {
    stop_flag: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn acquire(&mut self) -> Result<(), SessionError> {
        tokio::task::spawn_blocking(|| {
            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .ok_or(SessionError::DeviceUnavailable)?;
            device
                .default_input_config()
                .map_err(|_| SessionError::DeviceUnavailable)?;
            Ok(())
        })
        .await
        .map_err(|_| SessionError::DeviceUnavailable)?
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError> {
        let (tx, rx) = mpsc::channel::<AudioFrame>(64);
        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop_flag);

        let worker = std::thread::spawn(move || {
            if let Err(e) = run_input_stream(tx, stop_flag) {
                warn!("Microphone stream ended with error: {}", e);
            }
        });
        self.worker = Some(worker);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        }
        Ok(())
    }

    fn advertised_media_types(&self) -> Vec<MediaType> {
        vec![MediaType::WavPcm]
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

/// Worker-thread body: owns the cpal stream for its whole lifetime.
fn run_input_stream(
    tx: mpsc::Sender<AudioFrame>,
    stop_flag: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow::anyhow!("No default input device"))?;
    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let started = Instant::now();

    let send_frame = move |samples: Vec<i16>| {
        let frame = AudioFrame {
            samples,
            sample_rate,
            channels,
            timestamp_ms: started.elapsed().as_millis() as u64,
        };
        // Dropping a frame under backpressure beats blocking the callback.
        let _ = tx.try_send(frame);
    };

    let err_fn = |err| warn!("Audio input stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::I16 => {
            let send = send_frame.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    send(data.to_vec());
                },
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::U16 => {
            let send = send_frame.clone();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    send(data.iter().map(|&s| (s as i32 - 32_768) as i16).collect());
                },
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::F32 => {
            let send = send_frame.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    send(
                        data.iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect(),
                    );
                },
                err_fn,
                None,
            )?
        }
        other => anyhow::bail!("Unsupported input sample format: {:?}", other),
    };

    stream.play()?;

    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(10));
    }

    drop(stream);
    Ok(())
}

/// Backend for environments with no capture capability at all.
pub struct UnavailableBackend;

#[async_trait]
impl CaptureBackend for UnavailableBackend {
    async fn acquire(&mut self) -> Result<(), SessionError> {
        Err(SessionError::DeviceUnavailable)
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError> {
        Err(SessionError::DeviceUnavailable)
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn advertised_media_types(&self) -> Vec<MediaType> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
