use crate::{CaptureError, CoreResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Mono sample-rate converter from the device rate to the requested rate.
pub struct Resampler {
    inner: Option<Fft<f32>>,
    input_rate: u32,
    output_rate: u32,
}

impl Resampler {
    /// Build a converter. Equal rates produce a pass-through.
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> CoreResult<Self> {
        let inner = if input_rate == output_rate {
            None
        } else {
            let fft = Fft::<f32>::new(
                input_rate as usize,
                output_rate as usize,
                CHUNK_SIZE,
                SUB_CHUNKS,
                1,
                FixedSync::Input,
            )
            .map_err(|e| CaptureError::ResourceError {
                reason: format!("Failed to create resampler: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
            Some(fft)
        };

        debug!(
            input_rate,
            output_rate,
            passthrough = inner.is_none(),
            "Resampler initialized"
        );

        Ok(Self {
            inner,
            input_rate,
            output_rate,
        })
    }

    /// Convert a whole mono buffer.
    #[track_caller]
    #[instrument(skip(self, samples), fields(input_len = samples.len()))]
    pub fn convert(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        let Some(fft) = self.inner.as_mut() else {
            return Ok(samples.to_vec());
        };

        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let expected_len =
            (samples.len() as f64 * self.output_rate as f64 / self.input_rate as f64) as usize;
        let mut output = Vec::with_capacity(expected_len);
        let mut input_chunk = vec![0.0f32; CHUNK_SIZE];
        let output_frames = fft.output_frames_max();
        let mut output_chunk = vec![0.0f32; output_frames];

        for chunk in samples.chunks(CHUNK_SIZE) {
            // Last chunk is zero-padded; the tail is trimmed below.
            input_chunk[..chunk.len()].copy_from_slice(chunk);
            input_chunk[chunk.len()..].fill(0.0);

            let input_adapter = InterleavedSlice::new(&input_chunk, 1, CHUNK_SIZE)
                .map_err(|e| resampling_error(format!("Failed to wrap input chunk: {}", e)))?;
            let mut output_adapter = InterleavedSlice::new_mut(&mut output_chunk, 1, output_frames)
                .map_err(|e| resampling_error(format!("Failed to wrap output chunk: {}", e)))?;

            let (_, written) = fft
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(|e| resampling_error(format!("Resampling failed: {}", e)))?;

            output.extend_from_slice(&output_chunk[..written]);
        }

        output.truncate(expected_len);

        Ok(output)
    }
}

#[track_caller]
fn resampling_error(reason: String) -> CaptureError {
    CaptureError::ResourceError {
        reason,
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Duplicate a mono buffer across `channels` interleaved channels.
pub fn upmix(mono: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return mono.to_vec();
    }
    mono.iter()
        .flat_map(|&s| std::iter::repeat_n(s, channels))
        .collect()
}
