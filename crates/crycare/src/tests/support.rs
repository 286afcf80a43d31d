//! Stand-ins for the microphone, the prediction service and the tray.

use crate::{
    App, AppCommand, Notifier, TrayCommand, TrayMenuIds, TraySink,
};

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use crycare_core::{
    AudioBackend, AudioEncoding, AudioMode, AudioUpload, CaptureSettings, CaptureStateMachine,
    CoreResult, HistoryMirror, HistoryStore, MirrorDeletion, PermissionStatus,
    PredictionService, RawResponse, Recorder, RecorderStatus, RecordingOptions,
    RemoteHistoryEntry, SubmissionPipeline,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};
use tray_icon::menu::{MenuEvent, MenuId};

const SUPPORTED: &[AudioEncoding] = &[AudioEncoding::Wav];

/// Backend whose recorders report a three second recording.
pub(crate) struct FakeBackend;

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn request_permission(&self) -> CoreResult<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn set_audio_mode(&self, _mode: AudioMode) -> CoreResult<()> {
        Ok(())
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        SUPPORTED
    }

    async fn create_recorder(&self, _options: &RecordingOptions) -> CoreResult<Box<dyn Recorder>> {
        Ok(Box::new(FakeRecorder { unloaded: false }))
    }
}

struct FakeRecorder {
    unloaded: bool,
}

#[async_trait]
impl Recorder for FakeRecorder {
    async fn status(&mut self) -> CoreResult<RecorderStatus> {
        Ok(RecorderStatus {
            is_loaded: !self.unloaded,
            is_recording: !self.unloaded,
            metering_db: Some(-20.0),
            duration_millis: self.unloaded.then_some(3_000),
        })
    }

    fn uri(&self) -> Option<String> {
        Some("file:///tmp/crycare-app-test/recording.wav".to_string())
    }

    async fn stop_and_unload(&mut self) -> CoreResult<()> {
        self.unloaded = true;
        Ok(())
    }

    async fn unload(&mut self) -> CoreResult<()> {
        self.unloaded = true;
        Ok(())
    }
}

/// Service that classifies every upload as hungry.
pub(crate) struct HungryService;

#[async_trait]
impl PredictionService for HungryService {
    async fn predict(&self, _upload: &AudioUpload) -> CoreResult<RawResponse> {
        Ok(RawResponse {
            status: 200,
            body: r#"{"XGBoost": ["h"]}"#.to_string(),
        })
    }
}

/// Server history that remembers which ids were deleted.
#[derive(Default)]
pub(crate) struct FakeMirror {
    deleted: Mutex<Vec<String>>,
}

impl FakeMirror {
    #[allow(clippy::unwrap_used)]
    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryMirror for FakeMirror {
    async fn fetch_history(&self) -> CoreResult<Vec<RemoteHistoryEntry>> {
        Ok(Vec::new())
    }

    #[allow(clippy::unwrap_used)]
    async fn delete(&self, id: &str) -> CoreResult<MirrorDeletion> {
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(MirrorDeletion::Deleted)
    }
}

impl TraySink for mpsc::UnboundedSender<TrayCommand> {
    fn send(&self, command: TrayCommand) -> bool {
        mpsc::UnboundedSender::send(self, command).is_ok()
    }
}

/// Handles a test keeps after handing an [`App`] to `run()`.
pub(crate) struct Harness {
    pub(crate) machine: CaptureStateMachine,
    pub(crate) store: Arc<HistoryStore>,
    pub(crate) mirror: Arc<FakeMirror>,
    pub(crate) menu_ids: TrayMenuIds,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
    pub(crate) menu_tx: mpsc::Sender<MenuEvent>,
    pub(crate) tray_rx: mpsc::UnboundedReceiver<TrayCommand>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
}

impl Harness {
    /// Receive tray commands until `expected` arrives.
    pub(crate) async fn wait_for(&mut self, expected: TrayCommand) -> bool {
        while let Some(command) = self.tray_rx.recv().await {
            if command == expected {
                return true;
            }
        }
        false
    }

    /// Wait until the history holds `len` records.
    #[allow(clippy::unwrap_used)]
    pub(crate) async fn history_settles_at(&self, len: usize) -> bool {
        for _ in 0..50 {
            if self.store.list().await.unwrap().len() == len {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Deliver a tray menu click.
    #[allow(clippy::unwrap_used)]
    pub(crate) async fn click(&self, id: &MenuId) {
        self.menu_tx
            .send(MenuEvent { id: id.clone() })
            .await
            .unwrap();
    }
}

/// An [`App`] over fakes, storing history under `dir`.
pub(crate) fn app_with_fakes(dir: &TempDir) -> (App, Harness) {
    let mirror = Arc::new(FakeMirror::default());
    let store = Arc::new(
        HistoryStore::new(dir.path().join("history.json"))
            .with_mirror(Arc::clone(&mirror) as Arc<dyn HistoryMirror>),
    );
    let machine = CaptureStateMachine::new(
        Arc::new(FakeBackend),
        SubmissionPipeline::new(Arc::new(HungryService), Arc::clone(&store)),
        RecordingOptions::desktop(),
        CaptureSettings::default(),
    );

    let menu_ids = TrayMenuIds {
        record: MenuId::new("record"),
        history: MenuId::new("history"),
        remote_history: MenuId::new("remote_history"),
        delete_last: MenuId::new("delete_last"),
        clear_history: MenuId::new("clear_history"),
        settings: MenuId::new("settings"),
        exit: MenuId::new("exit"),
    };
    let (command_tx, command_rx) = mpsc::channel(8);
    let (menu_tx, menu_rx) = mpsc::channel(8);
    let (tray_tx, tray_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = App {
        machine: machine.clone(),
        store: Arc::clone(&store),
        notifier: Notifier::new(false),
        tray: Box::new(tray_tx),
        menu_ids: menu_ids.clone(),
        history_path: store.path().to_path_buf(),
        config_path: dir.path().join("config.toml"),
        command_tx: command_tx.clone(),
        command_rx,
        menu_rx,
        shutdown_tx,
    };

    let harness = Harness {
        machine,
        store,
        mirror,
        menu_ids,
        command_tx,
        menu_tx,
        tray_rx,
        shutdown_rx,
    };

    (app, harness)
}
