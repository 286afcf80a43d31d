use error_location::ErrorLocation;
use thiserror::Error;

/// Capture, submission and history errors with source location tracking.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Microphone access was not granted.
    #[error("Microphone permission denied {location}")]
    PermissionDenied {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording resource is already open.
    #[error("Recording device busy {location}")]
    DeviceBusy {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Opening, closing or unloading the recording resource failed.
    #[error("Recording resource error: {reason} {location}")]
    ResourceError {
        /// Description of the resource failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Recording stopped before the minimum duration elapsed.
    #[error("Recording too short: {elapsed_ms}ms {location}")]
    TooShort {
        /// Wall-clock duration of the discarded attempt.
        elapsed_ms: u64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Network or HTTP failure talking to the prediction service.
    #[error("Prediction service error: {reason} {location}")]
    ServiceError {
        /// Description of the service failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The service answered with a body that is not structured data.
    #[error("Malformed prediction response: {reason} {location}")]
    MalformedResponse {
        /// Description of the parse failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The structured response lacks a usable classifier label.
    #[error("Invalid prediction: {reason} {location}")]
    InvalidPrediction {
        /// Description of what was missing or mistyped.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Reading or writing the local history log failed.
    #[error("History storage error: {reason} {location}")]
    StorageError {
        /// Description of the storage failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CaptureError {
    /// Human-readable message for the user: a summary sentence, then the detail.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::PermissionDenied { .. } => {
                "Microphone permission is required. Please grant microphone access to record audio."
                    .to_string()
            }
            CaptureError::DeviceBusy { .. } => {
                "The microphone is already in use. Please try again in a moment.".to_string()
            }
            CaptureError::ResourceError { reason, .. } => {
                format!("Failed to record audio. {}", reason)
            }
            CaptureError::TooShort { .. } => {
                "Recording too short. Please record for at least 1 second.".to_string()
            }
            CaptureError::ServiceError { reason, .. } => {
                format!("Failed to process recording. {}", reason)
            }
            CaptureError::MalformedResponse { reason, .. } => {
                format!("Failed to process recording: invalid API response format. {}", reason)
            }
            CaptureError::InvalidPrediction { reason, .. } => {
                format!("Failed to process recording: no usable prediction. {}", reason)
            }
            CaptureError::StorageError { reason, .. } => {
                format!("Failed to update local history. {}", reason)
            }
        }
    }
}

/// Result type alias using [`CaptureError`].
pub type Result<T> = std::result::Result<T, CaptureError>;
