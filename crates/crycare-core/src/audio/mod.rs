mod amplitude;
mod backend;
pub(crate) mod capture;
mod options;
mod resampler;
mod session;
mod timers;

pub(crate) use resampler::{Resampler, downmix, upmix};

pub use {
    amplitude::{AMPLITUDE_MAX, AMPLITUDE_MIN, AmplitudeSampler, normalize_metering},
    backend::{AudioBackend, AudioMode, PermissionStatus, Recorder, RecorderStatus},
    capture::{CpalBackend, CpalRecorder},
    options::{AudioEncoding, RecordingOptions},
    session::{ClosedRecording, DEFAULT_SETTLE_DELAY, RecordingSession, remove_recording_file},
    timers::{AMPLITUDE_POLL, DURATION_TICK, Liveness, TimerIntervals, TimerManager},
};
