use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

use crate::error::SessionError;

/// A playable audio track, reduced to what the scrubber transport needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub duration_secs: f64,
}

impl Track {
    /// Probe an on-disk prompt file (MP3, M4A, WAV, OGG...) for its duration.
    pub fn probe_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|_| SessionError::PromptLoadFailure)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|_| SessionError::PromptLoadFailure)?;

        let track = probed
            .format
            .default_track()
            .ok_or(SessionError::PromptLoadFailure)?;

        let params = &track.codec_params;
        let duration_secs = match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => frames as f64 / rate as f64,
            _ => return Err(SessionError::PromptLoadFailure),
        };

        info!("Probed track: {} ({:.2}s)", path.display(), duration_secs);

        Ok(Self { duration_secs })
    }

    /// Build a track from an in-memory WAV artifact (recorded playback).
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|_| SessionError::PromptLoadFailure)?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(SessionError::PromptLoadFailure);
        }
        let duration_secs = reader.duration() as f64 / spec.sample_rate as f64;

        Ok(Self { duration_secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(frames: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn wav_bytes_duration_is_derived_from_spec() {
        let track = Track::from_wav_bytes(&wav_bytes(8000, 16000)).unwrap();
        assert!((track.duration_secs - 0.5).abs() < 1e-9);
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        assert_eq!(
            Track::from_wav_bytes(b"not a wav"),
            Err(SessionError::PromptLoadFailure)
        );
    }

    #[test]
    fn missing_file_fails_to_load() {
        assert_eq!(
            Track::probe_file("/nonexistent/prompt.mp3"),
            Err(SessionError::PromptLoadFailure)
        );
    }
}
