pub mod capture;
pub mod encode;
pub mod scrubber;
pub mod track;

pub use capture::{
    AudioFrame, CaptureBackend, CaptureDevice, CaptureOutcome, CaptureWindow, MicrophoneBackend,
    RecordingArtifact, UnavailableBackend,
};
pub use encode::{assemble_artifact, negotiate_media_type, MediaType};
pub use scrubber::{AudioScrubber, CompletionEvents};
pub use track::Track;
