pub mod audio;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod session;

pub use audio::{
    AudioFrame, AudioScrubber, CaptureBackend, CaptureDevice, CaptureOutcome, CaptureWindow,
    MediaType, MicrophoneBackend, RecordingArtifact, Track, UnavailableBackend,
};
pub use catalogue::{CatalogueLoader, CatalogueSource, PracticeItem};
pub use config::Config;
pub use error::SessionError;
pub use export::{export_item, CompletionMarker, Export};
pub use http::{create_router, AppState};
pub use session::{ControllerConfig, RecordingStore, SessionController, SessionPhase, SessionStats};
