use std::sync::Arc;

use tokio::sync::RwLock;

use crate::audio::CaptureDevice;
use crate::catalogue::PracticeItem;
use crate::session::{ControllerConfig, SessionController};

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The normalized catalogue, loaded at startup.
    pub catalogue: Arc<Vec<PracticeItem>>,
    /// Session-wide capture device (one acquisition, many uses).
    pub device: Arc<CaptureDevice>,
    pub controller_config: ControllerConfig,
    /// The single active session, if any.
    pub session: Arc<RwLock<Option<Arc<SessionController>>>>,
}

impl AppState {
    pub fn new(
        catalogue: Vec<PracticeItem>,
        device: Arc<CaptureDevice>,
        controller_config: ControllerConfig,
    ) -> Self {
        Self {
            catalogue: Arc::new(catalogue),
            device,
            controller_config,
            session: Arc::new(RwLock::new(None)),
        }
    }
}
