use crate::{CaptureError, CoreResult};

use std::{fmt, panic::Location};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classifier whose first candidate label becomes the displayed result.
pub const DISTINGUISHED_CLASSIFIER: &str = "XGBoost";

/// Canonical cry categories shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryCategory {
    /// Hunger cry.
    Hungry,
    /// Pain cry, including belly pain.
    Pain,
    /// General discomfort.
    Discomfort,
    /// Needs burping.
    Burping,
    /// Tiredness.
    Tired,
    /// Anything the lookup table does not recognize.
    Unknown,
}

impl CryCategory {
    /// Normalize a raw classifier label. Case-insensitive, whitespace-trimmed.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "h" | "hungry" => CryCategory::Hungry,
            "p" | "pain" | "belly_pain" => CryCategory::Pain,
            "d" | "discomfort" => CryCategory::Discomfort,
            "b" | "burping" => CryCategory::Burping,
            "t" | "tired" => CryCategory::Tired,
            _ => CryCategory::Unknown,
        }
    }

    /// Display name.
    pub fn display_name(self) -> &'static str {
        match self {
            CryCategory::Hungry => "Hungry",
            CryCategory::Pain => "Pain",
            CryCategory::Discomfort => "Discomfort",
            CryCategory::Burping => "Burping",
            CryCategory::Tired => "Tired",
            CryCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// First candidate label of a classifier entry: the head of a non-empty
/// list, or a single label.
pub fn first_candidate(entry: &Value) -> Option<&str> {
    let label = match entry {
        Value::Array(candidates) => candidates.first()?.as_str()?,
        Value::String(label) => label.as_str(),
        _ => return None,
    };
    (!label.trim().is_empty()).then_some(label)
}

/// Parsed prediction response: classifier name to candidate labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    classifiers: Map<String, Value>,
}

impl PredictionResult {
    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// `MalformedResponse` if the body is not JSON or not a JSON object.
    #[track_caller]
    pub fn parse(body: &str) -> CoreResult<Self> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| CaptureError::MalformedResponse {
                reason: format!("Response is not valid JSON: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        match value {
            Value::Object(classifiers) => Ok(Self { classifiers }),
            other => Err(CaptureError::MalformedResponse {
                reason: format!("Expected a JSON object, got: {}", other),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// First candidate of `classifier`.
    ///
    /// # Errors
    ///
    /// `InvalidPrediction` if the classifier is missing or its entry is
    /// neither a non-empty list of labels nor a single label.
    #[track_caller]
    pub fn first_label(&self, classifier: &str) -> CoreResult<&str> {
        let entry = self
            .classifiers
            .get(classifier)
            .ok_or_else(|| CaptureError::InvalidPrediction {
                reason: format!("Response has no {} prediction", classifier),
                location: ErrorLocation::from(Location::caller()),
            })?;

        first_candidate(entry).ok_or_else(|| CaptureError::InvalidPrediction {
            reason: format!("Unusable {} prediction: {}", classifier, entry),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// The full response as stored in history.
    pub fn into_value(self) -> Value {
        Value::Object(self.classifiers)
    }
}
