use crycare_core::CaptureState;

/// Tray icon states corresponding to the capture lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Ready to start recording.
    Idle,
    /// Currently recording audio.
    Recording,
    /// Busy: opening the microphone, finalizing or waiting for a classification.
    Processing,
    /// The last attempt failed.
    Error,
}

impl TrayIconState {
    /// Tooltip shown for this state. Recording includes the elapsed time.
    pub fn tooltip(self, elapsed_seconds: u64) -> String {
        match self {
            TrayIconState::Idle => "CryCare - Ready".to_string(),
            TrayIconState::Recording => format!(
                "CryCare - Recording {}",
                crycare_core::format_duration(elapsed_seconds)
            ),
            TrayIconState::Processing => "CryCare - Analyzing...".to_string(),
            TrayIconState::Error => "CryCare - Error".to_string(),
        }
    }
}

impl From<CaptureState> for TrayIconState {
    fn from(state: CaptureState) -> Self {
        match state {
            CaptureState::Idle => TrayIconState::Idle,
            CaptureState::Recording => TrayIconState::Recording,
            CaptureState::Initializing | CaptureState::Stopping | CaptureState::Processing => {
                TrayIconState::Processing
            }
            CaptureState::Error => TrayIconState::Error,
        }
    }
}
