mod client;
mod pipeline;
mod prediction;

pub use client::{
    AudioUpload, HistoryMirror, HttpPredictionClient, MirrorDeletion, PredictionService,
    RawResponse, RemoteHistoryEntry, UPLOAD_FIELD, platform_path,
};
pub use pipeline::{SubmissionPipeline, recorded_seconds, validate_response};
pub use prediction::{CryCategory, DISTINGUISHED_CLASSIFIER, PredictionResult, first_candidate};
