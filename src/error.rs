use thiserror::Error;

/// Recoverable failures surfaced by the practice session.
///
/// None of these terminate the session. Each degrades the current item to a
/// narrower capability and is rendered as status text for the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// No capture hardware in this environment, or permission was denied.
    #[error("Recording not available on this device.")]
    DeviceUnavailable,

    /// The item's configured recording duration is missing or non-positive.
    #[error("Invalid timeSec in data: {secs}")]
    InvalidDuration { secs: f64 },

    /// The prompt track could not be loaded; the delay must be triggered manually.
    #[error("Prompt audio failed to load.")]
    PromptLoadFailure,

    /// Captured chunks could not be assembled into an artifact.
    #[error("Captured audio could not be saved.")]
    CaptureAssemblyFailure,
}

impl SessionError {
    /// Whether this failure should flag the item as "attempted without a
    /// usable recording", which drives the export fallback marker.
    pub fn flags_unavailable(&self) -> bool {
        matches!(
            self,
            SessionError::DeviceUnavailable | SessionError::CaptureAssemblyFailure
        )
    }
}
