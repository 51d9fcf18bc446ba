use std::io::Cursor;

use crate::error::SessionError;

use super::capture::AudioFrame;

/// Encodings a recording artifact can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// 16-bit PCM WAV.
    WavPcm,
    /// Ogg-contained Opus.
    OggOpus,
    /// FLAC.
    Flac,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::WavPcm => "audio/wav",
            MediaType::OggOpus => "audio/ogg",
            MediaType::Flac => "audio/flac",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::WavPcm => "wav",
            MediaType::OggOpus => "ogg",
            MediaType::Flac => "flac",
        }
    }
}

/// Descending preference order for negotiated artifact encodings.
const PREFERRED: &[MediaType] = &[MediaType::WavPcm, MediaType::Flac, MediaType::OggOpus];

/// Pick the best mutually supported encoding.
///
/// Walks the preference list and returns the first encoding the backend
/// advertises. A backend that advertises nothing explicit still gets a usable
/// default (PCM WAV) rather than failing the capture outright.
pub fn negotiate_media_type(advertised: &[MediaType]) -> MediaType {
    PREFERRED
        .iter()
        .copied()
        .find(|mt| advertised.contains(mt))
        .or_else(|| advertised.first().copied())
        .unwrap_or(MediaType::WavPcm)
}

/// Assemble captured frames into a single artifact payload.
///
/// Only PCM WAV assembly is implemented in-process; a negotiated encoding we
/// cannot actually produce is an assembly failure, which the controller treats
/// like an unavailable device for that attempt.
pub fn assemble_artifact(
    frames: &[AudioFrame],
    media_type: MediaType,
) -> Result<Vec<u8>, SessionError> {
    if media_type != MediaType::WavPcm {
        return Err(SessionError::CaptureAssemblyFailure);
    }

    let first = frames.first().ok_or(SessionError::CaptureAssemblyFailure)?;

    let spec = hound::WavSpec {
        channels: first.channels,
        sample_rate: first.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|_| SessionError::CaptureAssemblyFailure)?;

        for frame in frames {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .map_err(|_| SessionError::CaptureAssemblyFailure)?;
            }
        }

        writer
            .finalize()
            .map_err(|_| SessionError::CaptureAssemblyFailure)?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_prefers_wav_when_advertised() {
        let picked = negotiate_media_type(&[MediaType::OggOpus, MediaType::WavPcm]);
        assert_eq!(picked, MediaType::WavPcm);
    }

    #[test]
    fn negotiation_falls_back_to_first_advertised() {
        let picked = negotiate_media_type(&[MediaType::OggOpus]);
        assert_eq!(picked, MediaType::OggOpus);
    }

    #[test]
    fn negotiation_defaults_to_wav_for_empty_list() {
        assert_eq!(negotiate_media_type(&[]), MediaType::WavPcm);
    }

    #[test]
    fn assembles_frames_into_parseable_wav() {
        let frames = vec![
            AudioFrame {
                samples: vec![100i16; 160],
                sample_rate: 16000,
                channels: 1,
                timestamp_ms: 0,
            },
            AudioFrame {
                samples: vec![-100i16; 160],
                sample_rate: 16000,
                channels: 1,
                timestamp_ms: 10,
            },
        ];

        let bytes = assemble_artifact(&frames, MediaType::WavPcm).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.len(), 320);
    }

    #[test]
    fn unsupported_encoding_is_an_assembly_failure() {
        let frames = vec![AudioFrame {
            samples: vec![0i16; 16],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        }];
        assert_eq!(
            assemble_artifact(&frames, MediaType::OggOpus),
            Err(SessionError::CaptureAssemblyFailure)
        );
    }

    #[test]
    fn empty_capture_is_an_assembly_failure() {
        assert_eq!(
            assemble_artifact(&[], MediaType::WavPcm),
            Err(SessionError::CaptureAssemblyFailure)
        );
    }
}
