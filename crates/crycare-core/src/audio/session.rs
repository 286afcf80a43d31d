use crate::{
    AudioEncoding, CaptureError, CoreResult, RecordingOptions,
    audio::{AudioBackend, AudioMode, PermissionStatus, Recorder, RecorderStatus},
    submission::platform_path,
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Default wait between stopping a resource and reading its duration.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// A finalized recording.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedRecording {
    /// Where the recording was written.
    pub uri: String,
    /// Duration reported by the resource after settling, if it reported one.
    pub duration_millis: Option<u64>,
    /// Encoder/container the file was written with.
    pub encoding: AudioEncoding,
}

/// Owns the lifecycle of one hardware recording resource.
///
/// The resource handle never leaves this struct; callers only get
/// operations. One session is constructed per recording attempt.
pub struct RecordingSession {
    backend: Arc<dyn AudioBackend>,
    options: RecordingOptions,
    settle_delay: Duration,
    recorder: Option<Box<dyn Recorder>>,
    started_at: Option<Instant>,
    closed: Option<ClosedRecording>,
}

impl RecordingSession {
    /// Create a session. No resource is acquired until [`open`](Self::open).
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        options: RecordingOptions,
        settle_delay: Duration,
    ) -> Self {
        Self {
            backend,
            options,
            settle_delay,
            recorder: None,
            started_at: None,
            closed: None,
        }
    }

    /// Whether a resource handle is currently held.
    pub fn is_open(&self) -> bool {
        self.recorder.is_some()
    }

    /// When the resource started recording.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Acquire permission, configure the audio subsystem and start a resource.
    ///
    /// # Errors
    ///
    /// `DeviceBusy` if a handle is still held, `PermissionDenied` if
    /// microphone access was refused, `ResourceError` for invalid options or
    /// backend failures.
    #[instrument(skip(self), fields(encoding = ?self.options.encoding))]
    pub async fn open(&mut self) -> CoreResult<()> {
        if self.recorder.is_some() {
            return Err(CaptureError::DeviceBusy {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.options.validate(self.backend.supported_encodings())?;

        if self.backend.request_permission().await? == PermissionStatus::Denied {
            return Err(CaptureError::PermissionDenied {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.backend.set_audio_mode(AudioMode::Recording).await?;

        let recorder = self.backend.create_recorder(&self.options).await?;
        self.recorder = Some(recorder);
        self.started_at = Some(Instant::now());
        self.closed = None;

        info!(
            sample_rate = self.options.sample_rate,
            channels = self.options.channels,
            "Recording resource opened"
        );

        Ok(())
    }

    /// Finalize the resource and return the recording.
    ///
    /// Calling this again after a successful close returns the same
    /// recording without touching the device.
    #[instrument(skip(self))]
    pub async fn close(&mut self) -> CoreResult<ClosedRecording> {
        if let Some(closed) = &self.closed {
            return Ok(closed.clone());
        }

        let Some(mut recorder) = self.recorder.take() else {
            return Err(CaptureError::ResourceError {
                reason: "No recording resource is open".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let uri = recorder.uri();

        let finalized = finalize(recorder.as_mut()).await;
        if let Err(e) = finalized {
            if let Err(unload_err) = recorder.unload().await {
                warn!(
                    error = ?unload_err,
                    "Failed to unload recording resource after failed stop"
                );
            }
            self.reset_audio_mode().await;
            return Err(e);
        }

        // Duration metadata is not always available right after stop.
        tokio::time::sleep(self.settle_delay).await;
        let duration_millis = match recorder.status().await {
            Ok(status) => status.duration_millis,
            Err(e) => {
                debug!(error = ?e, "Duration unavailable after stop");
                None
            }
        };
        drop(recorder);

        self.reset_audio_mode().await;

        let uri = uri.ok_or_else(|| CaptureError::ResourceError {
            reason: "Recording produced no output location".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(uri = %uri, duration_millis = ?duration_millis, "Recording resource closed");

        let closed = ClosedRecording {
            uri,
            duration_millis,
            encoding: self.options.encoding,
        };
        self.closed = Some(closed.clone());

        Ok(closed)
    }

    /// Throw away whatever is held without producing a recording.
    ///
    /// The resource is unloaded, never stopped, so no output is finalized;
    /// anything already at its output location is removed. Never fails;
    /// secondary failures are logged and swallowed.
    #[instrument(skip(self))]
    pub async fn discard(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.unload().await {
                warn!(error = ?e, "Failed to unload recording resource during discard");
            }
            if let Some(uri) = recorder.uri() {
                remove_recording_file(&uri).await;
            }
            info!("Recording resource discarded");
        }

        self.reset_audio_mode().await;
    }

    /// Current metering level, if the resource is recording and metering.
    pub async fn metering(&mut self) -> CoreResult<Option<f32>> {
        if !self.options.metering_enabled {
            return Ok(None);
        }

        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(None);
        };

        let status = recorder.status().await?;
        Ok(if status.is_recording {
            status.metering_db
        } else {
            None
        })
    }

    async fn reset_audio_mode(&self) {
        if let Err(e) = self.backend.set_audio_mode(AudioMode::Idle).await {
            warn!(error = ?e, "Failed to reset audio mode");
        }
    }
}

/// Delete the file behind a recording URI. A missing file is not an error.
pub async fn remove_recording_file(uri: &str) {
    let path = platform_path(uri);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!(path = ?path, "Recording file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?path, error = ?e, "Failed to remove recording file"),
    }
}

/// Stop-and-unload or merely unload, depending on the resource's own status.
async fn finalize(recorder: &mut dyn Recorder) -> CoreResult<()> {
    let status = match recorder.status().await {
        Ok(status) => status,
        Err(e) => {
            debug!(error = ?e, "Status unavailable before stop, assuming recording");
            RecorderStatus {
                is_loaded: true,
                is_recording: true,
                ..RecorderStatus::default()
            }
        }
    };

    if status.is_loaded && status.is_recording {
        recorder.stop_and_unload().await
    } else if status.is_loaded {
        recorder.unload().await
    } else {
        Ok(())
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.recorder.is_some() {
            warn!("RecordingSession dropped with an open resource");
        }
    }
}
