use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, instrument};

/// Duration tick period (1 Hz).
pub const DURATION_TICK: Duration = Duration::from_secs(1);
/// Amplitude poll period (10 Hz).
pub const AMPLITUDE_POLL: Duration = Duration::from_millis(100);

/// Tick periods for the two capture timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerIntervals {
    /// Elapsed-duration tick.
    pub duration_tick: Duration,
    /// Amplitude poll.
    pub amplitude_poll: Duration,
}

impl Default for TimerIntervals {
    fn default() -> Self {
        Self {
            duration_tick: DURATION_TICK,
            amplitude_poll: AMPLITUDE_POLL,
        }
    }
}

/// Liveness of one timer arming, handed to the amplitude callback so it can
/// re-check after its own suspension points.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// Whether the arming this flag belongs to is still active.
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Joint lifecycle of the duration tick and the amplitude poll.
///
/// Each arming gets a fresh liveness flag. Callbacks check it before doing
/// anything, so a callback already in flight when [`disarm`](Self::disarm)
/// runs becomes a no-op.
pub struct TimerManager {
    intervals: TimerIntervals,
    duration: Option<JoinHandle<()>>,
    amplitude: Option<JoinHandle<()>>,
    live: Arc<AtomicBool>,
}

impl TimerManager {
    /// Create an unarmed manager.
    pub fn new(intervals: TimerIntervals) -> Self {
        Self {
            intervals,
            duration: None,
            amplitude: None,
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether both timers are currently running.
    pub fn is_armed(&self) -> bool {
        self.duration.is_some() && self.amplitude.is_some()
    }

    /// Start both timers. Re-arming disarms the previous pair first.
    ///
    /// Neither callback fires immediately; the first call happens one
    /// period after arming.
    #[instrument(skip(self, on_tick, on_poll))]
    pub fn arm<T, P, F>(&mut self, mut on_tick: T, mut on_poll: P)
    where
        T: FnMut() + Send + 'static,
        P: FnMut(Liveness) -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        self.disarm();

        let live = Arc::new(AtomicBool::new(true));
        self.live = Arc::clone(&live);

        let tick_period = self.intervals.duration_tick;
        let tick_live = Arc::clone(&live);
        self.duration = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + tick_period, tick_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !tick_live.load(Ordering::Acquire) {
                    break;
                }
                on_tick();
            }
        }));

        let poll_period = self.intervals.amplitude_poll;
        let poll_live = live;
        self.amplitude = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + poll_period, poll_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !poll_live.load(Ordering::Acquire) {
                    break;
                }
                on_poll(Liveness(Arc::clone(&poll_live))).await;
            }
        }));

        debug!(
            duration_tick_ms = tick_period.as_millis(),
            amplitude_poll_ms = poll_period.as_millis(),
            "Timers armed"
        );
    }

    /// Stop both timers. Safe to call repeatedly or before [`arm`](Self::arm).
    #[instrument(skip(self))]
    pub fn disarm(&mut self) {
        self.live.store(false, Ordering::Release);

        let was_armed = self.duration.is_some() || self.amplitude.is_some();
        if let Some(handle) = self.duration.take() {
            handle.abort();
        }
        if let Some(handle) = self.amplitude.take() {
            handle.abort();
        }

        if was_armed {
            debug!("Timers disarmed");
        }
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.disarm();
    }
}
