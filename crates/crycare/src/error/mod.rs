use crycare_core::CaptureError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Failures of the CryCare tray application.
///
/// Recording, classification and history failures arrive wrapped from
/// crycare-core; the rest come from the desktop integration around it.
/// Every variant records where it was raised.
#[derive(Error, Debug)]
pub enum AppError {
    /// A history action from the tray menu failed, or the capture machine
    /// could not be built (for example an unusable prediction service URL).
    #[error("Capture error: {source} {location}")]
    Capture {
        /// What crycare-core reported.
        #[source]
        source: CaptureError,
        /// Where it surfaced in the app.
        location: ErrorLocation,
    },

    /// The record hotkey is taken by another program or the platform
    /// refused the registration.
    #[error("Hotkey registration failed: {reason} {location}")]
    HotkeyRegistrationFailed {
        /// Platform message.
        reason: String,
        /// Call site.
        location: ErrorLocation,
    },

    /// Drawing the state icon or building the tray menu failed.
    #[error("Tray error: {reason} {location}")]
    TrayError {
        /// What the tray backend reported.
        reason: String,
        /// Call site.
        location: ErrorLocation,
    },

    /// A prediction or history notification could not be shown.
    #[error("Notification failed: {reason} {location}")]
    NotificationFailed {
        /// What the notification daemon reported.
        reason: String,
        /// Call site.
        location: ErrorLocation,
    },

    /// A hotkey press could not reach the app loop because it has shut down.
    #[error("Channel send failed: {message} {location}")]
    ChannelSendFailed {
        /// Which command was lost.
        message: String,
        /// Call site.
        location: ErrorLocation,
    },

    /// `config.toml` could not be read, parsed or written, or the platform
    /// has no config directory.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// What went wrong with the file.
        reason: String,
        /// Call site.
        location: ErrorLocation,
    },

    /// Creating the config directory or opening the history log or
    /// settings file in the desktop's default program failed.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The filesystem or launcher error.
        #[source]
        source: std::io::Error,
        /// Call site.
        location: ErrorLocation,
    },
}

// #[from] cannot fill in the location field.
impl From<CaptureError> for AppError {
    #[track_caller]
    fn from(source: CaptureError) -> Self {
        AppError::Capture {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result alias for the tray application.
pub type Result<T> = StdResult<T, AppError>;
