use crate::{
    CaptureError, ClosedRecording, CoreResult,
    history::{HistoryRecord, HistoryStore},
    submission::{
        AudioUpload, CryCategory, DISTINGUISHED_CLASSIFIER, PredictionResult, PredictionService,
        RawResponse,
    },
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Check a raw service answer and parse it.
///
/// # Errors
///
/// `ServiceError` for a non-2xx status or an empty body,
/// `MalformedResponse` for a body that is not a JSON object.
#[track_caller]
pub fn validate_response(response: RawResponse) -> CoreResult<PredictionResult> {
    if !response.is_success() {
        return Err(CaptureError::ServiceError {
            reason: format!(
                "API request failed with status {}: {}",
                response.status, response.body
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if response.body.trim().is_empty() {
        return Err(CaptureError::ServiceError {
            reason: "Empty response from API".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    PredictionResult::parse(&response.body)
}

/// Duration recorded in history: the resource's own figure when it reported
/// a positive one, otherwise the wall-clock elapsed time.
pub fn recorded_seconds(recording: &ClosedRecording, wall_clock: Duration) -> u64 {
    recording
        .duration_millis
        .filter(|millis| *millis > 0)
        .map(|millis| millis / 1000)
        .unwrap_or_else(|| wall_clock.as_secs())
}

/// Uploads a finished recording, validates the answer and logs the result.
pub struct SubmissionPipeline {
    service: Arc<dyn PredictionService>,
    store: Arc<HistoryStore>,
}

impl SubmissionPipeline {
    /// Create a pipeline.
    pub fn new(service: Arc<dyn PredictionService>, store: Arc<HistoryStore>) -> Self {
        Self { service, store }
    }

    /// Classify one recording.
    ///
    /// `still_wanted` is checked once the classification is known; when it
    /// returns false the result is dropped unpersisted and `Ok(None)` is
    /// returned. A failing history write is logged, not returned.
    #[instrument(skip(self, recording, still_wanted), fields(uri = %recording.uri))]
    pub async fn submit<F>(
        &self,
        recording: &ClosedRecording,
        wall_clock: Duration,
        still_wanted: F,
    ) -> CoreResult<Option<HistoryRecord>>
    where
        F: Fn() -> bool + Send + Sync,
    {
        let upload = AudioUpload::from_recording(recording);
        debug!(path = ?upload.path, file_name = %upload.file_name, "Submitting recording");

        let response = self.service.predict(&upload).await?;
        let predictions = validate_response(response)?;
        let label = predictions.first_label(DISTINGUISHED_CLASSIFIER)?;
        let category = CryCategory::from_label(label);

        if !still_wanted() {
            info!(%category, "Classification no longer wanted, discarding");
            return Ok(None);
        }

        let record = HistoryRecord::new(
            recording.uri.clone(),
            recorded_seconds(recording, wall_clock),
            category.display_name(),
            predictions.into_value(),
        );

        if let Err(e) = self.store.append(record.clone()).await {
            warn!(error = ?e, id = %record.id, "Failed to save history record");
        }

        info!(
            id = %record.id,
            label = %record.prediction_label,
            duration = %record.formatted_duration,
            "Recording classified"
        );

        Ok(Some(record))
    }
}
