//! CryCare Core Library
//!
//! Audio capture lifecycle for a cry classifier client: a state machine that
//! owns one recording resource at a time, drives the elapsed and amplitude
//! indicators, submits finished recordings to a prediction service and keeps
//! a bounded local history.
//!
//! # Example
//!
//! ```no_run
//! use crycare_core::{
//!     CaptureSettings, CaptureStateMachine, CoreResult, CpalBackend, HistoryStore,
//!     HttpPredictionClient, RecordingOptions, SubmissionPipeline,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let client = Arc::new(HttpPredictionClient::new(
//!         "http://localhost:5000",
//!         Duration::from_secs(30),
//!     )?);
//!     let store = Arc::new(HistoryStore::new("history.json").with_mirror(client.clone()));
//!     let machine = CaptureStateMachine::new(
//!         Arc::new(CpalBackend::new("recordings")),
//!         SubmissionPipeline::new(client, store),
//!         RecordingOptions::desktop(),
//!         CaptureSettings::default(),
//!     );
//!
//!     machine.request_start().await;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     machine.request_stop().await;
//!
//!     machine.teardown().await;
//!     Ok(())
//! }
//! ```

mod audio;
mod capture;
mod error;
mod history;
mod submission;

pub use {
    audio::{
        AMPLITUDE_MAX, AMPLITUDE_MIN, AMPLITUDE_POLL, AmplitudeSampler, AudioBackend,
        AudioEncoding, AudioMode, ClosedRecording, CpalBackend, CpalRecorder,
        DEFAULT_SETTLE_DELAY, DURATION_TICK, Liveness, PermissionStatus, Recorder,
        RecorderStatus, RecordingOptions, RecordingSession, TimerIntervals, TimerManager,
        normalize_metering, remove_recording_file,
    },
    capture::{
        CaptureEvent, CaptureSettings, CaptureState, CaptureStateMachine, ERROR_RECOVERY_DELAY,
        MIN_RECORDING_DURATION,
    },
    error::{CaptureError, Result as CoreResult},
    history::{HISTORY_ID_PREFIX, HISTORY_LIMIT, HistoryRecord, HistoryStore, format_duration},
    submission::{
        AudioUpload, CryCategory, DISTINGUISHED_CLASSIFIER, HistoryMirror, HttpPredictionClient,
        MirrorDeletion, PredictionResult, PredictionService, RawResponse, RemoteHistoryEntry,
        SubmissionPipeline, UPLOAD_FIELD, first_candidate, platform_path, recorded_seconds,
        validate_response,
    },
};

#[cfg(test)]
mod tests;
