use crate::config::{
    default_error_recovery_delay_ms, default_min_duration_ms, default_settle_delay_ms,
};

use std::time::Duration;

use crycare_core::{AudioEncoding, CaptureSettings, RecordingOptions, TimerIntervals};
use serde::{Deserialize, Serialize};

/// Recording resource and capture timing configuration.
///
/// Resource fields default to [`RecordingOptions::desktop`]; they are checked
/// against the backend's encoder set when a session opens, not at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output channel count.
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Target encoder bit rate.
    #[serde(default = "default_bit_rate")]
    pub bit_rate: u32,

    /// Encoder/container pair (`wav` or `mpeg4_aac`).
    #[serde(default = "default_encoding")]
    pub encoding: AudioEncoding,

    /// Whether the amplitude indicator is driven by metering.
    #[serde(default = "default_metering_enabled")]
    pub metering_enabled: bool,

    /// Recordings shorter than this are discarded.
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,

    /// Time spent showing an error before returning to idle.
    #[serde(default = "default_error_recovery_delay_ms")]
    pub error_recovery_delay_ms: u64,

    /// Wait after stopping before the recording's duration is read.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl RecordingConfig {
    /// Options handed to the audio backend.
    pub fn options(&self) -> RecordingOptions {
        RecordingOptions {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_rate: self.bit_rate,
            encoding: self.encoding,
            metering_enabled: self.metering_enabled,
        }
    }

    /// Timing knobs for the capture machine.
    pub fn settings(&self) -> CaptureSettings {
        CaptureSettings {
            min_duration: Duration::from_millis(self.min_duration_ms),
            error_recovery_delay: Duration::from_millis(self.error_recovery_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            timers: TimerIntervals::default(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bit_rate: default_bit_rate(),
            encoding: default_encoding(),
            metering_enabled: default_metering_enabled(),
            min_duration_ms: default_min_duration_ms(),
            error_recovery_delay_ms: default_error_recovery_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_sample_rate() -> u32 {
    RecordingOptions::desktop().sample_rate
}

fn default_channels() -> u16 {
    RecordingOptions::desktop().channels
}

fn default_bit_rate() -> u32 {
    RecordingOptions::desktop().bit_rate
}

fn default_encoding() -> AudioEncoding {
    RecordingOptions::desktop().encoding
}

fn default_metering_enabled() -> bool {
    RecordingOptions::desktop().metering_enabled
}
