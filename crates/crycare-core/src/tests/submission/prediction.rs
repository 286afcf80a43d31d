use crate::{CaptureError, CryCategory, DISTINGUISHED_CLASSIFIER, PredictionResult};

/// WHAT: Short codes and long names map to the canonical categories
/// WHY: Classifier variants emit either form
#[test]
fn given_known_labels_when_normalizing_then_canonical_category() {
    let cases = [
        ("h", CryCategory::Hungry),
        ("hungry", CryCategory::Hungry),
        ("p", CryCategory::Pain),
        ("pain", CryCategory::Pain),
        ("belly_pain", CryCategory::Pain),
        ("d", CryCategory::Discomfort),
        ("discomfort", CryCategory::Discomfort),
        ("b", CryCategory::Burping),
        ("burping", CryCategory::Burping),
        ("t", CryCategory::Tired),
        ("tired", CryCategory::Tired),
    ];

    for (label, expected) in cases {
        assert_eq!(CryCategory::from_label(label), expected, "label {:?}", label);
    }
}

/// WHAT: Normalization ignores case and surrounding whitespace
/// WHY: Labels come from an external service
#[test]
fn given_mixed_case_label_when_normalizing_then_matched() {
    assert_eq!(CryCategory::from_label("  Hungry "), CryCategory::Hungry);
    assert_eq!(CryCategory::from_label("BELLY_PAIN"), CryCategory::Pain);
}

/// WHAT: Anything outside the table is Unknown
/// WHY: New classifier labels must still display
#[test]
fn given_unrecognized_label_when_normalizing_then_unknown() {
    assert_eq!(CryCategory::from_label("lonely"), CryCategory::Unknown);
    assert_eq!(CryCategory::from_label(""), CryCategory::Unknown);
    assert_eq!(CryCategory::Unknown.to_string(), "Unknown");
}

/// WHAT: The first candidate of the distinguished classifier is selected
/// WHY: Other classifiers are kept for history but not displayed
#[test]
#[allow(clippy::unwrap_used)]
fn given_ranked_candidates_when_reading_label_then_first_of_xgboost() {
    // Given
    let result = PredictionResult::parse(
        r#"{"RandomForest": ["pain"], "KNN": ["tired"], "XGBoost": ["hungry", "pain"]}"#,
    )
    .unwrap();

    // When
    let label = result.first_label(DISTINGUISHED_CLASSIFIER).unwrap();

    // Then
    assert_eq!(label, "hungry");
    assert_eq!(result.first_label("RandomForest").unwrap(), "pain");
}

/// WHAT: A bare string label is accepted
/// WHY: Some server versions return a single label per classifier
#[test]
#[allow(clippy::unwrap_used)]
fn given_single_label_when_reading_label_then_accepted() {
    let result = PredictionResult::parse(r#"{"XGBoost": "b"}"#).unwrap();

    assert_eq!(result.first_label(DISTINGUISHED_CLASSIFIER).unwrap(), "b");
}

/// WHAT: Missing, empty or mistyped classifier entries are InvalidPrediction
/// WHY: The record cannot be built without a label
#[test]
#[allow(clippy::unwrap_used)]
fn given_unusable_entry_when_reading_label_then_invalid_prediction() {
    let bodies = [
        r#"{"KNN": ["hungry"]}"#,
        r#"{"XGBoost": []}"#,
        r#"{"XGBoost": [42]}"#,
        r#"{"XGBoost": ""}"#,
        r#"{"XGBoost": null}"#,
        r#"{"XGBoost": {"label": "hungry"}}"#,
    ];

    for body in bodies {
        let result = PredictionResult::parse(body).unwrap();
        assert!(
            matches!(
                result.first_label(DISTINGUISHED_CLASSIFIER),
                Err(CaptureError::InvalidPrediction { .. })
            ),
            "accepted {}",
            body
        );
    }
}

/// WHAT: Non-JSON and non-object bodies are MalformedResponse
/// WHY: Only a classifier-to-labels object is structured data here
#[test]
fn given_unstructured_body_when_parsing_then_malformed_response() {
    for body in ["<html>oops</html>", "[\"hungry\"]", "\"hungry\"", "42"] {
        assert!(
            matches!(
                PredictionResult::parse(body),
                Err(CaptureError::MalformedResponse { .. })
            ),
            "accepted {}",
            body
        );
    }
}
