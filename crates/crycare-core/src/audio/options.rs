use crate::{CaptureError, CoreResult};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Lowest sample rate accepted by any supported encoder.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Highest sample rate accepted by any supported encoder.
pub const MAX_SAMPLE_RATE: u32 = 48_000;
/// Mono or stereo only.
pub const MAX_CHANNELS: u16 = 2;

/// Encoder/container pair produced by the platform audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// AAC audio in an MPEG-4 container (`.m4a`).
    Mpeg4Aac,
    /// 16-bit PCM in a RIFF/WAVE container (`.wav`).
    Wav,
}

impl AudioEncoding {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            AudioEncoding::Mpeg4Aac => "m4a",
            AudioEncoding::Wav => "wav",
        }
    }

    /// MIME type declared on upload.
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioEncoding::Mpeg4Aac => "audio/m4a",
            AudioEncoding::Wav => "audio/wav",
        }
    }

    /// Multipart file name declared on upload.
    pub fn upload_file_name(self) -> String {
        format!("recording.{}", self.extension())
    }
}

/// Options for opening a recording resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingOptions {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Target encoder bit rate in bits per second.
    pub bit_rate: u32,
    /// Encoder/container pair.
    pub encoding: AudioEncoding,
    /// Whether the resource reports a metering level while recording.
    pub metering_enabled: bool,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            bit_rate: 64_000,
            encoding: AudioEncoding::Mpeg4Aac,
            metering_enabled: true,
        }
    }
}

impl RecordingOptions {
    /// Default options with the WAV container desktop backends write.
    pub fn desktop() -> Self {
        Self {
            encoding: AudioEncoding::Wav,
            ..Self::default()
        }
    }

    /// Check the options against the backend's accepted encoder set.
    #[track_caller]
    pub fn validate(&self, supported: &[AudioEncoding]) -> CoreResult<()> {
        let reason = if !supported.contains(&self.encoding) {
            Some(format!(
                "Encoding {:?} is not supported by this device (supported: {:?})",
                self.encoding, supported
            ))
        } else if self.channels == 0 || self.channels > MAX_CHANNELS {
            Some(format!("Unsupported channel count: {}", self.channels))
        } else if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            Some(format!("Unsupported sample rate: {}Hz", self.sample_rate))
        } else if self.bit_rate == 0 {
            Some("Bit rate must be greater than zero".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CaptureError::ResourceError {
                reason,
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }
}
