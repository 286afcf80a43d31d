use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Prefix of locally generated record ids.
pub const HISTORY_ID_PREFIX: &str = "history-";

/// One completed classification, as persisted in the local log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Unique, time-ordered id.
    pub id: String,
    /// Location of the submitted recording.
    pub recording_uri: String,
    /// Whole seconds of audio.
    pub duration_seconds: u64,
    /// `m:ss` rendering of `duration_seconds`.
    pub formatted_duration: String,
    /// Normalized category name.
    pub prediction_label: String,
    /// Full classifier response.
    pub raw_predictions: Value,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// Build a record stamped with the current time and a fresh id.
    pub fn new(
        recording_uri: impl Into<String>,
        duration_seconds: u64,
        prediction_label: impl Into<String>,
        raw_predictions: Value,
    ) -> Self {
        Self {
            id: format!("{}{}", HISTORY_ID_PREFIX, Uuid::now_v7()),
            recording_uri: recording_uri.into(),
            duration_seconds,
            formatted_duration: format_duration(duration_seconds),
            prediction_label: prediction_label.into(),
            raw_predictions,
            timestamp: Utc::now(),
        }
    }
}

/// Render whole seconds as `m:ss`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
