//! Desktop notifications for capture outcomes.

use crate::{AppError, AppResult};

use std::panic::Location;

use crycare_core::{CaptureEvent, CryCategory, DISTINGUISHED_CLASSIFIER, RemoteHistoryEntry};
use error_location::ErrorLocation;
use notify_rust::Notification;
use tracing::{debug, instrument};

const APP_NAME: &str = "CryCare";

/// Server history entries listed in one notification.
pub const REMOTE_HISTORY_SHOWN: usize = 5;

/// Summary line and body for a capture event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationText {
    /// Title line.
    pub summary: String,
    /// Detail text.
    pub body: String,
}

impl From<&CaptureEvent> for NotificationText {
    fn from(event: &CaptureEvent) -> Self {
        match event {
            CaptureEvent::Notice { message } => Self::notice(message.clone()),
            CaptureEvent::Failed { message } => Self {
                summary: "Recording failed".to_string(),
                body: message.clone(),
            },
            CaptureEvent::Completed(record) => Self {
                summary: format!("Prediction: {}", record.prediction_label),
                body: format!("Recording length {}", record.formatted_duration),
            },
        }
    }
}

impl NotificationText {
    /// Notice with the application name as its title.
    pub fn notice(body: impl Into<String>) -> Self {
        Self {
            summary: APP_NAME.to_string(),
            body: body.into(),
        }
    }

    /// The newest server history entries, one `timestamp: category` per line.
    pub fn remote_history(entries: &[RemoteHistoryEntry]) -> Self {
        if entries.is_empty() {
            return Self {
                summary: "Server history".to_string(),
                body: "No recordings on the server".to_string(),
            };
        }

        let lines: Vec<String> = entries
            .iter()
            .take(REMOTE_HISTORY_SHOWN)
            .map(|entry| {
                let when = entry
                    .parsed_timestamp()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unknown time".to_string());
                let category = entry
                    .label(DISTINGUISHED_CLASSIFIER)
                    .map_or(CryCategory::Unknown, CryCategory::from_label);
                format!("{}: {}", when, category)
            })
            .collect();

        Self {
            summary: format!("Server history ({})", entries.len()),
            body: lines.join("\n"),
        }
    }
}

/// Shows capture events as desktop notifications.
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    /// Create a notifier. A disabled notifier only logs.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Show the notification for `event`.
    pub async fn notify(&self, event: &CaptureEvent) -> AppResult<()> {
        self.show(NotificationText::from(event)).await
    }

    /// Show `text` as a desktop notification.
    #[instrument(skip(self))]
    pub async fn show(&self, text: NotificationText) -> AppResult<()> {
        if !self.enabled {
            debug!(summary = %text.summary, "Notifications disabled, skipping");
            return Ok(());
        }

        // Some platforms block in show() while talking to the notification daemon.
        let shown = tokio::task::spawn_blocking(move || {
            Notification::new()
                .appname(APP_NAME)
                .summary(&text.summary)
                .body(&text.body)
                .show()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r);

        shown.map_err(|reason| AppError::NotificationFailed {
            reason,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
