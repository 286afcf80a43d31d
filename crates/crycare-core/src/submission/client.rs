//! Prediction service and remote history mirror.

use crate::{CaptureError, ClosedRecording, CoreResult, submission::first_candidate};

use std::{panic::Location, path::PathBuf, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use error_location::ErrorLocation;
use reqwest::{
    StatusCode, Url,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Multipart field carrying the audio file.
pub const UPLOAD_FIELD: &str = "file";

/// Audio file to submit for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    /// Local file path of the recording.
    pub path: PathBuf,
    /// File name declared in the multipart part.
    pub file_name: String,
    /// Content type declared in the multipart part.
    pub mime_type: &'static str,
}

impl AudioUpload {
    /// Describe a finished recording as an upload.
    pub fn from_recording(recording: &ClosedRecording) -> Self {
        Self {
            path: platform_path(&recording.uri),
            file_name: recording.encoding.upload_file_name(),
            mime_type: recording.encoding.mime_type(),
        }
    }
}

/// File path for a recording URI (`file://` scheme stripped).
pub fn platform_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Unvalidated HTTP answer of the prediction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote classifier.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Submit one recording and return the raw answer.
    async fn predict(&self, upload: &AudioUpload) -> CoreResult<RawResponse>;
}

/// Entry of the remote history mirror.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteHistoryEntry {
    /// Server-assigned id.
    pub id: String,
    /// Server timestamp, ISO 8601 with or without offset.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Uploaded file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Raw classifier output.
    #[serde(default)]
    pub predictions: Value,
}

impl RemoteHistoryEntry {
    /// Timestamp as an instant. Offset-less values are taken as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|t| t.and_utc())
            })
    }

    /// First candidate of `classifier`, if usable.
    pub fn label(&self, classifier: &str) -> Option<&str> {
        self.predictions.get(classifier).and_then(first_candidate)
    }
}

/// Outcome of a remote delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorDeletion {
    /// The server removed the entry.
    Deleted,
    /// The server did not have the entry (404).
    AlreadyAbsent,
}

/// Remote copy of the prediction history.
#[async_trait]
pub trait HistoryMirror: Send + Sync {
    /// All remote entries, in server order.
    async fn fetch_history(&self) -> CoreResult<Vec<RemoteHistoryEntry>>;

    /// Remove one entry. A missing entry is not an error.
    async fn delete(&self, id: &str) -> CoreResult<MirrorDeletion>;
}

/// HTTP client for `/predict` and `/history`.
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPredictionClient {
    /// Create a client for the service at `base_url`.
    #[track_caller]
    #[instrument]
    pub fn new(base_url: &str, timeout: Duration) -> CoreResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| CaptureError::ServiceError {
            reason: format!("Invalid service URL {:?}: {}", base_url, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CaptureError::ServiceError {
                reason: format!("Failed to build HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(base_url = %base_url, "Prediction client initialized");

        Ok(Self { client, base_url })
    }

    #[track_caller]
    fn endpoint(&self, segments: &[&str]) -> CoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CaptureError::ServiceError {
                reason: format!("Service URL cannot take a path: {}", self.base_url),
                location: ErrorLocation::from(Location::caller()),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[track_caller]
fn transport_error(e: reqwest::Error) -> CaptureError {
    CaptureError::ServiceError {
        reason: format!("Request failed: {}", e),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    #[instrument(skip(self))]
    async fn predict(&self, upload: &AudioUpload) -> CoreResult<RawResponse> {
        let bytes =
            tokio::fs::read(&upload.path)
                .await
                .map_err(|e| CaptureError::ResourceError {
                    reason: format!("Failed to read recording {:?}: {}", upload.path, e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(upload.file_name.clone())
            .mime_str(upload.mime_type)
            .map_err(transport_error)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.endpoint(&["predict"])?;
        debug!(url = %url, size, "Sending audio for prediction");

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        info!(status, body_len = body.len(), "Prediction response received");

        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl HistoryMirror for HttpPredictionClient {
    #[instrument(skip(self))]
    async fn fetch_history(&self) -> CoreResult<Vec<RemoteHistoryEntry>> {
        let url = self.endpoint(&["history"])?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::ServiceError {
                reason: format!("History request failed with status {}", status),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        let entries: Vec<RemoteHistoryEntry> =
            serde_json::from_str(&body).map_err(|e| CaptureError::MalformedResponse {
                reason: format!("History response is not a list of entries: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(count = entries.len(), "Remote history fetched");

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> CoreResult<MirrorDeletion> {
        let url = self.endpoint(&["history", id])?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(id, "Remote history entry already absent");
            return Ok(MirrorDeletion::AlreadyAbsent);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CaptureError::ServiceError {
                reason: format!("Failed to delete history item. Status: {}, {}", status, body),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(id, "Remote history entry deleted");

        Ok(MirrorDeletion::Deleted)
    }
}
