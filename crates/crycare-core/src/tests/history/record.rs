use crate::{HISTORY_ID_PREFIX, HistoryRecord, format_duration};

use serde_json::json;

/// WHAT: Durations render as minutes and zero-padded seconds
/// WHY: History rows show m:ss
#[test]
fn given_seconds_when_formatting_then_minutes_and_padded_seconds() {
    assert_eq!(format_duration(0), "0:00");
    assert_eq!(format_duration(7), "0:07");
    assert_eq!(format_duration(60), "1:00");
    assert_eq!(format_duration(754), "12:34");
}

/// WHAT: New records get unique prefixed ids and a formatted duration
/// WHY: Ids key deletes; two records created together must not collide
#[test]
fn given_two_new_records_then_ids_unique_and_fields_derived() {
    let first = HistoryRecord::new("file:///a.wav", 65, "Hungry", json!({}));
    let second = HistoryRecord::new("file:///b.wav", 3, "Tired", json!({}));

    assert!(first.id.starts_with(HISTORY_ID_PREFIX));
    assert_ne!(first.id, second.id);
    assert_eq!(first.formatted_duration, "1:05");
    assert!(second.timestamp >= first.timestamp);
}

/// WHAT: Records serialize with camelCase keys and an RFC 3339 timestamp
/// WHY: The on-disk log format is shared with other clients
#[test]
#[allow(clippy::unwrap_used)]
fn given_record_when_serialized_then_camel_case_fields() {
    let record = HistoryRecord::new(
        "file:///a.wav",
        3,
        "Pain",
        json!({ "XGBoost": ["p"] }),
    );

    let value = serde_json::to_value(&record).unwrap();

    for key in [
        "id",
        "recordingUri",
        "durationSeconds",
        "formattedDuration",
        "predictionLabel",
        "rawPredictions",
        "timestamp",
    ] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    let timestamp = value["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}
