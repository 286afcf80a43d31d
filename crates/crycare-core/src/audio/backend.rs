//! Seam to the platform audio subsystem.
//!
//! The capture flow only ever talks to these traits. A [`Recorder`] is the
//! hardware recording resource; it is handed out by [`AudioBackend`] and then
//! owned by exactly one [`RecordingSession`](crate::RecordingSession).

use crate::{AudioEncoding, CoreResult, RecordingOptions};

use async_trait::async_trait;

/// Outcome of a microphone permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Access granted.
    Granted,
    /// Access refused or unavailable.
    Denied,
}

/// Global audio mode of the platform subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Input routed for recording.
    Recording,
    /// Recording disabled (the reset state).
    Idle,
}

/// Point-in-time status of a recording resource.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecorderStatus {
    /// The resource still holds platform state.
    pub is_loaded: bool,
    /// The resource is actively capturing.
    pub is_recording: bool,
    /// Current input level, decibel-like and typically negative.
    pub metering_db: Option<f32>,
    /// Recorded duration, once known.
    pub duration_millis: Option<u64>,
}

/// Platform audio subsystem.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Ask for microphone access.
    async fn request_permission(&self) -> CoreResult<PermissionStatus>;

    /// Switch the global audio mode.
    async fn set_audio_mode(&self, mode: AudioMode) -> CoreResult<()>;

    /// Encoder/container pairs this backend can produce.
    fn supported_encodings(&self) -> &[AudioEncoding];

    /// Create and start a recording resource.
    async fn create_recorder(&self, options: &RecordingOptions) -> CoreResult<Box<dyn Recorder>>;
}

/// A hardware recording resource.
///
/// `status()` and `uri()` stay callable after the resource is unloaded.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Current status.
    async fn status(&mut self) -> CoreResult<RecorderStatus>;

    /// Location the recording is (or will be) written to.
    fn uri(&self) -> Option<String>;

    /// Stop capturing, finalize the output and release platform state.
    async fn stop_and_unload(&mut self) -> CoreResult<()>;

    /// Release platform state of a resource that is no longer capturing.
    async fn unload(&mut self) -> CoreResult<()>;
}
