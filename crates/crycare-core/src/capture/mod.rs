mod machine;
mod state;

pub use machine::{CaptureSettings, CaptureStateMachine, ERROR_RECOVERY_DELAY, MIN_RECORDING_DURATION};
pub use state::{CaptureEvent, CaptureState};
