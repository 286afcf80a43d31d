use crate::{CoreResult, RecordingSession};

use tracing::trace;

/// Lower bound of the normalized intensity.
pub const AMPLITUDE_MIN: f32 = 0.1;
/// Upper bound of the normalized intensity.
pub const AMPLITUDE_MAX: f32 = 2.0;

const METERING_SCALE: f32 = -20.0;
const METERING_OFFSET: f32 = 1.0;

/// Map a raw metering reading to the bounded visual intensity.
///
/// Returns `None` for NaN, which carries no level information.
pub fn normalize_metering(metering_db: f32) -> Option<f32> {
    if metering_db.is_nan() {
        return None;
    }
    let scaled = metering_db / METERING_SCALE + METERING_OFFSET;
    Some(scaled.clamp(AMPLITUDE_MIN, AMPLITUDE_MAX))
}

/// Converts metering readings from the active session into intensity samples.
///
/// Failed or missing readings keep the previous sample instead of resetting
/// it, so the indicator does not flicker.
#[derive(Debug, Clone)]
pub struct AmplitudeSampler {
    last: f32,
}

impl Default for AmplitudeSampler {
    fn default() -> Self {
        Self { last: AMPLITUDE_MIN }
    }
}

impl AmplitudeSampler {
    /// Create a sampler resting at [`AMPLITUDE_MIN`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Last valid sample.
    pub fn last(&self) -> f32 {
        self.last
    }

    /// Fold one metering reading into the current sample.
    pub fn observe(&mut self, reading: CoreResult<Option<f32>>) -> f32 {
        match reading {
            Ok(Some(metering_db)) => {
                if let Some(sample) = normalize_metering(metering_db) {
                    self.last = sample;
                }
            }
            Ok(None) => {}
            Err(e) => trace!(error = ?e, "Metering unavailable, keeping last sample"),
        }
        self.last
    }

    /// Read the session's metering level and fold it in.
    pub async fn poll(&mut self, session: &mut RecordingSession) -> f32 {
        let reading = session.metering().await;
        self.observe(reading)
    }
}
