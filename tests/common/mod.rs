// Shared test support: scripted capture backends so capability absence,
// denial, and assembly failure need no real hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use speakdrill::audio::{AudioFrame, CaptureBackend, MediaType};
use speakdrill::error::SessionError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct ScriptedBackend {
    deny: bool,
    acquire_delay: Duration,
    media_types: Arc<Mutex<Vec<MediaType>>>,
    acquire_calls: Arc<AtomicUsize>,
    feeder: Option<JoinHandle<()>>,
}

impl ScriptedBackend {
    pub fn granted() -> Self {
        Self {
            deny: false,
            acquire_delay: Duration::ZERO,
            media_types: Arc::new(Mutex::new(vec![MediaType::WavPcm])),
            acquire_calls: Arc::new(AtomicUsize::new(0)),
            feeder: None,
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::granted()
        }
    }

    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    /// Counter of how many times access was actually requested.
    pub fn acquire_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.acquire_calls)
    }

    /// Handle allowing a test to change the advertised encodings mid-session.
    pub fn media_types_handle(&self) -> Arc<Mutex<Vec<MediaType>>> {
        Arc::clone(&self.media_types)
    }
}

#[async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn acquire(&mut self) -> Result<(), SessionError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }
        if self.deny {
            Err(SessionError::DeviceUnavailable)
        } else {
            Ok(())
        }
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError> {
        if self.deny {
            return Err(SessionError::DeviceUnavailable);
        }

        let (tx, rx) = mpsc::channel(64);
        self.feeder = Some(tokio::spawn(async move {
            let mut elapsed_ms = 0u64;
            loop {
                let frame = AudioFrame {
                    samples: vec![100i16; 320],
                    sample_rate: 16000,
                    channels: 1,
                    timestamp_ms: elapsed_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                elapsed_ms += 20;
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
        Ok(())
    }

    fn advertised_media_types(&self) -> Vec<MediaType> {
        self.media_types.lock().unwrap().clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
