use crate::{
    AMPLITUDE_MIN, AmplitudeSampler, AudioBackend, AudioMode, CaptureError, DEFAULT_SETTLE_DELAY,
    Liveness, RecordingOptions, RecordingSession, TimerIntervals, TimerManager,
    capture::{CaptureEvent, CaptureState},
    submission::SubmissionPipeline,
};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{
    sync::{Mutex, broadcast, watch},
    time::Instant,
};
use tracing::{debug, error, info, instrument, warn};

/// Shortest recording that is submitted.
pub const MIN_RECORDING_DURATION: Duration = Duration::from_secs(1);
/// Time spent in `Error` before returning to `Idle`.
pub const ERROR_RECOVERY_DELAY: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 32;

/// Timing knobs of the capture machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Recordings shorter than this are discarded with a notice.
    pub min_duration: Duration,
    /// Delay of the automatic `Error` to `Idle` transition.
    pub error_recovery_delay: Duration,
    /// Wait between stopping the resource and reading its duration.
    pub settle_delay: Duration,
    /// Duration tick and amplitude poll periods.
    pub timers: TimerIntervals,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            min_duration: MIN_RECORDING_DURATION,
            error_recovery_delay: ERROR_RECOVERY_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            timers: TimerIntervals::default(),
        }
    }
}

/// Resources of the attempt currently in flight.
struct Attempt {
    session: Arc<Mutex<RecordingSession>>,
    timers: TimerManager,
    started_at: Option<Instant>,
}

struct Inner {
    backend: Arc<dyn AudioBackend>,
    pipeline: SubmissionPipeline,
    options: RecordingOptions,
    settings: CaptureSettings,
    state: watch::Sender<CaptureState>,
    elapsed: watch::Sender<u64>,
    amplitude: watch::Sender<f32>,
    events: broadcast::Sender<CaptureEvent>,
    attempt: Mutex<Option<Attempt>>,
    torn_down: AtomicBool,
}

/// Single authority over the capture lifecycle.
///
/// Cloning yields another handle to the same machine. Transitions are
/// compare-and-set on the published state, so concurrent or repeated
/// requests are resolved by whichever arrives first; the rest are no-ops.
#[derive(Clone)]
pub struct CaptureStateMachine {
    inner: Arc<Inner>,
}

impl CaptureStateMachine {
    /// Create a machine in `Idle`.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        pipeline: SubmissionPipeline,
        options: RecordingOptions,
        settings: CaptureSettings,
    ) -> Self {
        let (state, _) = watch::channel(CaptureState::Idle);
        let (elapsed, _) = watch::channel(0);
        let (amplitude, _) = watch::channel(AMPLITUDE_MIN);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                backend,
                pipeline,
                options,
                settings,
                state,
                elapsed,
                amplitude,
                events,
                attempt: Mutex::new(None),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        *self.inner.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<CaptureState> {
        self.inner.state.subscribe()
    }

    /// Watch the elapsed-seconds counter.
    pub fn subscribe_elapsed(&self) -> watch::Receiver<u64> {
        self.inner.elapsed.subscribe()
    }

    /// Watch the normalized amplitude.
    pub fn subscribe_amplitude(&self) -> watch::Receiver<f32> {
        self.inner.amplitude.subscribe()
    }

    /// Receive user-facing outcomes.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CaptureEvent> {
        self.inner.events.subscribe()
    }

    /// Elapsed seconds shown right now.
    pub fn elapsed_seconds(&self) -> u64 {
        *self.inner.elapsed.borrow()
    }

    /// Amplitude shown right now.
    pub fn amplitude(&self) -> f32 {
        *self.inner.amplitude.borrow()
    }

    /// Whether the single start/stop control is enabled.
    pub fn is_toggle_enabled(&self) -> bool {
        !self.inner.torn_down.load(Ordering::Acquire) && self.state().accepts_toggle()
    }

    /// Whether a recording resource handle is held.
    pub async fn has_open_resource(&self) -> bool {
        let session = self
            .inner
            .attempt
            .lock()
            .await
            .as_ref()
            .map(|attempt| Arc::clone(&attempt.session));

        match session {
            Some(session) => session.lock().await.is_open(),
            None => false,
        }
    }

    /// Whether the duration tick and amplitude poll are running.
    pub async fn timers_armed(&self) -> bool {
        self.inner
            .attempt
            .lock()
            .await
            .as_ref()
            .is_some_and(|attempt| attempt.timers.is_armed())
    }

    /// Start when idle, stop when recording, otherwise nothing.
    ///
    /// Returns whether the request was honored.
    pub async fn toggle(&self) -> bool {
        match self.state() {
            CaptureState::Idle => self.request_start().await,
            CaptureState::Recording => self.request_stop().await,
            other => {
                debug!(state = %other, "Toggle ignored");
                false
            }
        }
    }

    /// Begin a recording attempt. Honored only in `Idle`.
    #[instrument(skip(self))]
    pub async fn request_start(&self) -> bool {
        if self.inner.torn_down.load(Ordering::Acquire) {
            debug!("Start ignored after teardown");
            return false;
        }
        if !self.transition(CaptureState::Idle, CaptureState::Initializing) {
            debug!(state = %self.state(), "Start ignored");
            return false;
        }

        self.inner.elapsed.send_replace(0);
        self.inner.amplitude.send_replace(AMPLITUDE_MIN);

        let session = Arc::new(Mutex::new(RecordingSession::new(
            Arc::clone(&self.inner.backend),
            self.inner.options.clone(),
            self.inner.settings.settle_delay,
        )));
        *self.inner.attempt.lock().await = Some(Attempt {
            session: Arc::clone(&session),
            timers: TimerManager::new(self.inner.settings.timers),
            started_at: None,
        });

        let opened = {
            let mut session = session.lock().await;
            session.open().await.map(|()| session.started_at())
        };
        let started_at = match opened {
            Ok(started_at) => started_at.unwrap_or_else(Instant::now),
            Err(e) => {
                self.fail(e).await;
                return true;
            }
        };

        let mut slot = self.inner.attempt.lock().await;
        let current = slot
            .as_ref()
            .is_some_and(|attempt| Arc::ptr_eq(&attempt.session, &session));
        if !current {
            // Torn down while the resource was opening.
            drop(slot);
            session.lock().await.discard().await;
            return true;
        }
        let Some(attempt) = slot.as_mut() else {
            return true;
        };

        attempt.started_at = Some(started_at);
        self.arm_timers(attempt, started_at);

        if self.transition(CaptureState::Initializing, CaptureState::Recording) {
            info!("Recording started");
        }
        true
    }

    /// Finish the current recording and submit it. Honored only in `Recording`.
    #[instrument(skip(self))]
    pub async fn request_stop(&self) -> bool {
        if self.inner.torn_down.load(Ordering::Acquire) {
            debug!("Stop ignored after teardown");
            return false;
        }
        if !self.transition(CaptureState::Recording, CaptureState::Stopping) {
            debug!(state = %self.state(), "Stop ignored");
            return false;
        }

        let attempt = self.inner.attempt.lock().await.take();
        let Some(mut attempt) = attempt else {
            self.fail(CaptureError::ResourceError {
                reason: "No recording to stop".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
            .await;
            return true;
        };

        attempt.timers.disarm();
        let elapsed = attempt
            .started_at
            .map(|started_at| started_at.elapsed())
            .unwrap_or_default();
        self.inner.elapsed.send_replace(rounded_secs(elapsed));
        self.inner.amplitude.send_replace(AMPLITUDE_MIN);

        if elapsed < self.inner.settings.min_duration {
            attempt.session.lock().await.discard().await;
            let notice = CaptureError::TooShort {
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                location: ErrorLocation::from(Location::caller()),
            };
            info!(elapsed_ms = elapsed.as_millis(), "Recording discarded as too short");
            self.emit(CaptureEvent::Notice {
                message: notice.user_message(),
            });
            self.transition(CaptureState::Stopping, CaptureState::Idle);
            return true;
        }

        let closed = attempt.session.lock().await.close().await;
        drop(attempt);
        let recording = match closed {
            Ok(recording) => recording,
            Err(e) => {
                self.fail(e).await;
                return true;
            }
        };

        if !self.transition(CaptureState::Stopping, CaptureState::Processing) {
            return true;
        }

        let inner = &self.inner;
        let outcome = inner
            .pipeline
            .submit(&recording, elapsed, || {
                !inner.torn_down.load(Ordering::Acquire)
            })
            .await;

        match outcome {
            Ok(Some(record)) => {
                self.emit(CaptureEvent::Completed(record));
                self.transition(CaptureState::Processing, CaptureState::Idle);
            }
            Ok(None) => {
                self.transition(CaptureState::Processing, CaptureState::Idle);
            }
            Err(e) => self.fail(e).await,
        }
        true
    }

    /// Release everything regardless of state. Later requests are ignored,
    /// and a classification still in flight is discarded when it lands.
    #[instrument(skip(self))]
    pub async fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let state = self.state();
        info!(%state, "Tearing down capture");

        self.cleanup().await;

        if state != CaptureState::Processing {
            self.inner.state.send_replace(CaptureState::Idle);
        }
    }

    fn arm_timers(&self, attempt: &mut Attempt, started_at: Instant) {
        let tick_inner = Arc::downgrade(&self.inner);
        let on_tick = move || {
            let Some(inner) = tick_inner.upgrade() else {
                return;
            };
            let secs = started_at.elapsed().as_secs();
            inner.elapsed.send_if_modified(|shown| {
                if secs > *shown {
                    *shown = secs;
                    true
                } else {
                    false
                }
            });
        };

        let poll_inner = Arc::downgrade(&self.inner);
        let session = Arc::clone(&attempt.session);
        let sampler = Arc::new(Mutex::new(AmplitudeSampler::new()));
        let on_poll = move |live: Liveness| {
            let inner = poll_inner.clone();
            let session = Arc::clone(&session);
            let sampler = Arc::clone(&sampler);
            async move {
                let sample = {
                    let mut sampler = sampler.lock().await;
                    let mut session = session.lock().await;
                    sampler.poll(&mut session).await
                };
                if !live.is_live() {
                    return;
                }
                if let Some(inner) = inner.upgrade() {
                    inner.amplitude.send_replace(sample);
                }
            }
        };

        attempt.timers.arm(on_tick, on_poll);
    }

    /// Compare-and-set on the published state.
    fn transition(&self, from: CaptureState, to: CaptureState) -> bool {
        let moved = self.inner.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if moved {
            debug!(%from, %to, "Capture state changed");
        }
        moved
    }

    fn emit(&self, event: CaptureEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("No capture event subscribers");
        }
    }

    async fn fail(&self, e: CaptureError) {
        if self.inner.torn_down.load(Ordering::Acquire) {
            warn!(error = ?e, "Capture failed after teardown");
            self.cleanup().await;
            self.inner.state.send_replace(CaptureState::Idle);
            return;
        }

        let from = self.inner.state.send_replace(CaptureState::Error);
        error!(error = ?e, %from, "Capture failed");
        self.emit(CaptureEvent::Failed {
            message: e.user_message(),
        });

        self.cleanup().await;

        let machine = self.clone();
        let delay = self.inner.settings.error_recovery_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if machine.transition(CaptureState::Error, CaptureState::Idle) {
                info!("Recovered from capture error");
            }
        });
    }

    /// Disarm timers, release the resource and reset the counters.
    async fn cleanup(&self) {
        let attempt = self.inner.attempt.lock().await.take();
        match attempt {
            Some(mut attempt) => {
                attempt.timers.disarm();
                attempt.session.lock().await.discard().await;
            }
            None => {
                if let Err(e) = self.inner.backend.set_audio_mode(AudioMode::Idle).await {
                    warn!(error = ?e, "Failed to reset audio mode");
                }
            }
        }

        self.inner.elapsed.send_replace(0);
        self.inner.amplitude.send_replace(AMPLITUDE_MIN);
    }
}

/// Whole seconds, rounded to nearest.
fn rounded_secs(elapsed: Duration) -> u64 {
    u64::try_from((elapsed.as_millis() + 500) / 1000).unwrap_or(u64::MAX)
}
