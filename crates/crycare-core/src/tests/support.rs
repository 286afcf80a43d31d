//! In-memory stand-ins for the audio subsystem, the prediction service and
//! the remote history mirror.

use crate::{
    AudioBackend, AudioEncoding, AudioMode, AudioUpload, CaptureError, CaptureSettings,
    CaptureStateMachine, CoreResult, HistoryMirror, HistoryStore, MirrorDeletion,
    PermissionStatus, RawResponse, Recorder, RecorderStatus, RecordingOptions,
    RemoteHistoryEntry, SubmissionPipeline, PredictionService,
};

use std::{
    panic::Location,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde_json::json;
use tempfile::TempDir;

pub(crate) const FAKE_URI: &str = "file:///tmp/crycare-test/recording.m4a";

fn fake_error(reason: &str) -> CaptureError {
    CaptureError::ResourceError {
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Behaviour of a [`FakeBackend`] and the recorders it creates.
#[derive(Debug, Clone)]
pub(crate) struct FakeConfig {
    pub(crate) permission: PermissionStatus,
    pub(crate) create_fails: bool,
    pub(crate) stop_fails: bool,
    pub(crate) status_fails: bool,
    pub(crate) duration_millis: Option<u64>,
    pub(crate) uri: Option<String>,
    pub(crate) supported: Vec<AudioEncoding>,
    pub(crate) open_delay: Duration,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            create_fails: false,
            stop_fails: false,
            status_fails: false,
            duration_millis: Some(3_000),
            uri: Some(FAKE_URI.to_string()),
            supported: vec![AudioEncoding::Mpeg4Aac, AudioEncoding::Wav],
            open_delay: Duration::ZERO,
        }
    }
}

/// Calls observed by a [`FakeBackend`].
#[derive(Debug, Clone, Default)]
pub(crate) struct BackendLog {
    pub(crate) permission_requests: usize,
    pub(crate) mode_changes: Vec<AudioMode>,
    pub(crate) recorders_created: usize,
    pub(crate) live_recorders: usize,
    pub(crate) stops: usize,
    pub(crate) unloads: usize,
}

struct Shared {
    config: FakeConfig,
    log: Mutex<BackendLog>,
    metering: Mutex<Option<f32>>,
}

impl Shared {
    #[allow(clippy::unwrap_used)]
    fn log(&self) -> std::sync::MutexGuard<'_, BackendLog> {
        self.log.lock().unwrap()
    }
}

pub(crate) struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_config(FakeConfig::default())
    }

    pub(crate) fn with_config(config: FakeConfig) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                config,
                log: Mutex::new(BackendLog::default()),
                metering: Mutex::new(None),
            }),
        })
    }

    pub(crate) fn log(&self) -> BackendLog {
        self.shared.log().clone()
    }

    #[allow(clippy::unwrap_used)]
    pub(crate) fn set_metering(&self, metering_db: Option<f32>) {
        *self.shared.metering.lock().unwrap() = metering_db;
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn request_permission(&self) -> CoreResult<PermissionStatus> {
        self.shared.log().permission_requests += 1;
        Ok(self.shared.config.permission)
    }

    async fn set_audio_mode(&self, mode: AudioMode) -> CoreResult<()> {
        self.shared.log().mode_changes.push(mode);
        Ok(())
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        &self.shared.config.supported
    }

    async fn create_recorder(&self, _options: &RecordingOptions) -> CoreResult<Box<dyn Recorder>> {
        if !self.shared.config.open_delay.is_zero() {
            tokio::time::sleep(self.shared.config.open_delay).await;
        }
        if self.shared.config.create_fails {
            return Err(fake_error("recorder could not be prepared"));
        }

        let mut log = self.shared.log();
        log.recorders_created += 1;
        log.live_recorders += 1;

        Ok(Box::new(FakeRecorder {
            shared: Arc::clone(&self.shared),
            loaded: true,
            recording: true,
        }))
    }
}

struct FakeRecorder {
    shared: Arc<Shared>,
    loaded: bool,
    recording: bool,
}

#[async_trait]
impl Recorder for FakeRecorder {
    #[allow(clippy::unwrap_used)]
    async fn status(&mut self) -> CoreResult<RecorderStatus> {
        if self.shared.config.status_fails {
            return Err(fake_error("status unavailable"));
        }

        let metering_db = *self.shared.metering.lock().unwrap();
        Ok(RecorderStatus {
            is_loaded: self.loaded,
            is_recording: self.recording,
            metering_db: self.recording.then_some(metering_db).flatten(),
            duration_millis: if self.loaded {
                None
            } else {
                self.shared.config.duration_millis
            },
        })
    }

    fn uri(&self) -> Option<String> {
        self.shared.config.uri.clone()
    }

    async fn stop_and_unload(&mut self) -> CoreResult<()> {
        if self.shared.config.stop_fails {
            return Err(fake_error("stop failed"));
        }
        self.shared.log().stops += 1;
        self.recording = false;
        self.loaded = false;
        Ok(())
    }

    async fn unload(&mut self) -> CoreResult<()> {
        self.shared.log().unloads += 1;
        self.recording = false;
        self.loaded = false;
        Ok(())
    }
}

impl Drop for FakeRecorder {
    fn drop(&mut self) {
        if let Ok(mut log) = self.shared.log.lock() {
            log.live_recorders -= 1;
        }
    }
}

/// Canned answer of a [`FakePredictionService`].
#[derive(Debug, Clone)]
pub(crate) enum FakeReply {
    Respond(RawResponse),
    Fail(String),
}

pub(crate) struct FakePredictionService {
    reply: FakeReply,
    delay: Duration,
    uploads: Mutex<Vec<AudioUpload>>,
}

impl FakePredictionService {
    pub(crate) fn responding(status: u16, body: impl Into<String>) -> Self {
        Self {
            reply: FakeReply::Respond(RawResponse {
                status,
                body: body.into(),
            }),
            delay: Duration::ZERO,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn classifying(label: &str) -> Self {
        Self::responding(200, prediction_body(label))
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            reply: FakeReply::Fail(reason.to_string()),
            delay: Duration::ZERO,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[allow(clippy::unwrap_used)]
    pub(crate) fn uploads(&self) -> Vec<AudioUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionService for FakePredictionService {
    #[allow(clippy::unwrap_used)]
    async fn predict(&self, upload: &AudioUpload) -> CoreResult<RawResponse> {
        self.uploads.lock().unwrap().push(upload.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            FakeReply::Respond(response) => Ok(response.clone()),
            FakeReply::Fail(reason) => Err(CaptureError::ServiceError {
                reason: reason.clone(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Canned delete outcome of a [`FakeMirror`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeDeletion {
    Deleted,
    AlreadyAbsent,
    Fail,
}

pub(crate) struct FakeMirror {
    pub(crate) entries: Vec<RemoteHistoryEntry>,
    pub(crate) deletion: FakeDeletion,
    deleted: Mutex<Vec<String>>,
}

impl FakeMirror {
    pub(crate) fn new(entries: Vec<RemoteHistoryEntry>, deletion: FakeDeletion) -> Arc<Self> {
        Arc::new(Self {
            entries,
            deletion,
            deleted: Mutex::new(Vec::new()),
        })
    }

    #[allow(clippy::unwrap_used)]
    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryMirror for FakeMirror {
    async fn fetch_history(&self) -> CoreResult<Vec<RemoteHistoryEntry>> {
        Ok(self.entries.clone())
    }

    #[allow(clippy::unwrap_used)]
    async fn delete(&self, id: &str) -> CoreResult<MirrorDeletion> {
        self.deleted.lock().unwrap().push(id.to_string());
        match self.deletion {
            FakeDeletion::Deleted => Ok(MirrorDeletion::Deleted),
            FakeDeletion::AlreadyAbsent => Ok(MirrorDeletion::AlreadyAbsent),
            FakeDeletion::Fail => Err(CaptureError::ServiceError {
                reason: "Failed to delete history item. Status: 500".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Body the classifier service returns, with `label` ranked first everywhere.
pub(crate) fn prediction_body(label: &str) -> String {
    json!({
        "RandomForest": [label],
        "KNN": [label],
        "XGBoost": [label],
    })
    .to_string()
}

pub(crate) fn remote_entry(id: &str, timestamp: Option<&str>) -> RemoteHistoryEntry {
    RemoteHistoryEntry {
        id: id.to_string(),
        timestamp: timestamp.map(str::to_string),
        filename: Some("recording.m4a".to_string()),
        predictions: json!({ "XGBoost": ["hungry"] }),
    }
}

/// A capture machine over fakes with its history in `dir`.
pub(crate) fn machine_with(
    backend: Arc<FakeBackend>,
    service: Arc<FakePredictionService>,
    dir: &TempDir,
) -> (CaptureStateMachine, Arc<HistoryStore>) {
    let store = Arc::new(HistoryStore::new(dir.path().join("history.json")));
    let machine = CaptureStateMachine::new(
        backend,
        SubmissionPipeline::new(service, Arc::clone(&store)),
        RecordingOptions::default(),
        CaptureSettings::default(),
    );
    (machine, store)
}
