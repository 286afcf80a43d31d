use std::fmt;

use serde::Serialize;

use crate::history::HistoryRecord;

/// Lifecycle phase of the capture machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// Ready to start.
    #[default]
    Idle,
    /// Acquiring permission and the recording resource.
    Initializing,
    /// Resource open, timers armed.
    Recording,
    /// Timers disarmed, resource being finalized.
    Stopping,
    /// Recording submitted, waiting for the classification.
    Processing,
    /// An attempt failed; returns to `Idle` after the recovery delay.
    Error,
}

impl CaptureState {
    /// Whether a start or stop request would be honored.
    pub fn accepts_toggle(self) -> bool {
        matches!(self, CaptureState::Idle | CaptureState::Recording)
    }

    /// Whether the elapsed counter is frozen at its final value.
    pub fn is_frozen(self) -> bool {
        matches!(self, CaptureState::Stopping | CaptureState::Processing)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Initializing => "initializing",
            CaptureState::Recording => "recording",
            CaptureState::Stopping => "stopping",
            CaptureState::Processing => "processing",
            CaptureState::Error => "error",
        };
        f.write_str(name)
    }
}

/// User-facing outcome of a capture attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Informational message; the attempt ended without error.
    Notice {
        /// Text for the user.
        message: String,
    },
    /// The attempt failed.
    Failed {
        /// Text for the user.
        message: String,
    },
    /// A classification completed and was logged.
    Completed(HistoryRecord),
}
