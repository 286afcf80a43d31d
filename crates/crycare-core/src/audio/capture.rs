//! Desktop audio backend on top of CPAL.
//!
//! Captures the default input device into memory, reports an RMS level as
//! the metering signal, and on stop writes a 16-bit WAV file converted to
//! the requested sample rate and channel count.

use crate::{
    AudioEncoding, CaptureError, CoreResult, RecordingOptions,
    audio::{
        AudioBackend, AudioMode, PermissionStatus, Recorder, RecorderStatus, Resampler, downmix,
        upmix,
    },
};

use std::{
    collections::VecDeque,
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Maximum interleaved samples to buffer (5 minutes of 48kHz stereo).
/// Oldest samples are dropped beyond this.
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 2 * 60 * 5;

/// Floor of the metering range, matching what mobile platforms report for silence.
pub(crate) const METERING_FLOOR_DB: f32 = -160.0;

const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Give an in-flight callback time to observe the shutdown flag.
const CALLBACK_DRAIN: Duration = Duration::from_millis(5);

/// RMS level of a buffer in dBFS, floored at [`METERING_FLOOR_DB`].
pub(crate) fn rms_dbfs(data: &[f32]) -> f32 {
    if data.is_empty() {
        return METERING_FLOOR_DB;
    }
    let mean_square = data.iter().map(|s| s * s).sum::<f32>() / data.len() as f32;
    let rms = mean_square.sqrt();
    if rms <= 0.0 {
        return METERING_FLOOR_DB;
    }
    (20.0 * rms.log10()).max(METERING_FLOOR_DB)
}

/// State shared between the CPAL callback and the recorder.
pub(crate) struct CaptureBuffer {
    samples: Mutex<VecDeque<f32>>,
    level_bits: AtomicU32,
    frames: AtomicU64,
    /// Set before the stream is dropped so no in-flight callback writes
    /// after the buffer is drained.
    shutdown: AtomicBool,
}

impl CaptureBuffer {
    pub(crate) fn new() -> Self {
        Self {
            samples: Mutex::new(VecDeque::new()),
            level_bits: AtomicU32::new(METERING_FLOOR_DB.to_bits()),
            frames: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    pub(crate) fn push(&self, data: &[f32], channels: u16) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }

        self.level_bits
            .store(rms_dbfs(data).to_bits(), Ordering::Release);
        self.frames.fetch_add(
            (data.len() / usize::from(channels.max(1))) as u64,
            Ordering::AcqRel,
        );

        // A poisoned lock still holds valid samples.
        let mut buf = self.samples.lock().unwrap_or_else(|e| {
            error!("Sample buffer lock poisoned, recovering: {}", e);
            e.into_inner()
        });
        buf.extend(data.iter().copied());
        while buf.len() > MAX_BUFFER_SAMPLES {
            buf.pop_front();
        }
    }

    pub(crate) fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Acquire))
    }

    pub(crate) fn drain(&self) -> Vec<f32> {
        let mut buf = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        buf.drain(..).collect()
    }
}

/// Default-input-device backend writing WAV files.
pub struct CpalBackend {
    recordings_dir: PathBuf,
}

impl CpalBackend {
    /// Create a backend that writes recordings under `recordings_dir`.
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
        }
    }
}

#[async_trait]
impl AudioBackend for CpalBackend {
    #[instrument(skip(self))]
    async fn request_permission(&self) -> CoreResult<PermissionStatus> {
        // Desktop hosts expose no permission prompt; an absent or blocked
        // microphone shows up as no default input device.
        let available = tokio::task::spawn_blocking(|| {
            cpal::default_host().default_input_device().is_some()
        })
        .await
        .map_err(|e| CaptureError::ResourceError {
            reason: format!("Device probe task failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(if available {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn set_audio_mode(&self, mode: AudioMode) -> CoreResult<()> {
        debug!(?mode, "Audio mode change is a no-op on desktop hosts");
        Ok(())
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        &[AudioEncoding::Wav]
    }

    #[instrument(skip(self))]
    async fn create_recorder(&self, options: &RecordingOptions) -> CoreResult<Box<dyn Recorder>> {
        tokio::fs::create_dir_all(&self.recordings_dir)
            .await
            .map_err(|e| CaptureError::ResourceError {
                reason: format!(
                    "Failed to create recordings directory {:?}: {}",
                    self.recordings_dir, e
                ),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let path = self.recordings_dir.join(format!(
            "recording-{}.{}",
            Uuid::new_v4(),
            options.encoding.extension()
        ));

        let recorder = CpalRecorder::start(options.clone(), path)?;
        Ok(Box::new(recorder))
    }
}

/// One live CPAL input stream.
pub struct CpalRecorder {
    stream: Option<Stream>,
    buffer: Arc<CaptureBuffer>,
    device_rate: u32,
    device_channels: u16,
    options: RecordingOptions,
    path: PathBuf,
    loaded: bool,
    recording: bool,
    duration_millis: Option<u64>,
}

impl CpalRecorder {
    #[track_caller]
    #[instrument(skip(options))]
    fn start(options: RecordingOptions, path: PathBuf) -> CoreResult<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(CaptureError::PermissionDenied {
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| CaptureError::ResourceError {
                reason: format!("Failed to get input config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();

        let buffer = Arc::new(CaptureBuffer::new());
        let callback_buffer = Arc::clone(&buffer);
        let channels = config.channels;

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback_buffer.push(data, channels);
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CaptureError::ResourceError {
                reason: format!("Failed to build input stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| CaptureError::ResourceError {
            reason: format!("Failed to start input stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            device_rate = config.sample_rate,
            device_channels = config.channels,
            path = ?path,
            "CPAL capture started"
        );

        Ok(Self {
            stream: Some(stream),
            buffer,
            device_rate: config.sample_rate,
            device_channels: config.channels,
            options,
            path,
            loaded: true,
            recording: true,
            duration_millis: None,
        })
    }

    async fn halt_stream(&mut self) {
        self.buffer.shutdown.store(true, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tokio::time::sleep(CALLBACK_DRAIN).await;
            debug!("CPAL stream dropped");
        }
        self.recording = false;
    }

    fn live_duration_millis(&self) -> u64 {
        let frames = self.buffer.frames.load(Ordering::Acquire);
        frames * 1000 / u64::from(self.device_rate.max(1))
    }
}

#[async_trait]
impl Recorder for CpalRecorder {
    async fn status(&mut self) -> CoreResult<RecorderStatus> {
        Ok(RecorderStatus {
            is_loaded: self.loaded,
            is_recording: self.recording,
            metering_db: self
                .recording
                .then(|| self.buffer.level())
                .filter(|_| self.options.metering_enabled),
            duration_millis: if self.recording {
                Some(self.live_duration_millis())
            } else {
                self.duration_millis
            },
        })
    }

    fn uri(&self) -> Option<String> {
        Some(format!("file://{}", self.path.display()))
    }

    #[instrument(skip(self))]
    async fn stop_and_unload(&mut self) -> CoreResult<()> {
        if !self.loaded {
            return Ok(());
        }

        self.halt_stream().await;
        self.loaded = false;

        let samples = self.buffer.drain();
        let job = WavJob {
            samples,
            device_rate: self.device_rate,
            device_channels: self.device_channels,
            sample_rate: self.options.sample_rate,
            channels: self.options.channels,
            path: self.path.clone(),
        };

        let duration_millis = tokio::task::spawn_blocking(move || job.write())
            .await
            .map_err(|e| CaptureError::ResourceError {
                reason: format!("WAV writer task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })??;

        self.duration_millis = Some(duration_millis);
        info!(path = ?self.path, duration_millis, "Recording written");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unload(&mut self) -> CoreResult<()> {
        self.halt_stream().await;
        self.loaded = false;
        let discarded = self.buffer.drain();
        debug!(sample_count = discarded.len(), "Recording discarded");
        Ok(())
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        self.buffer.shutdown.store(true, Ordering::Release);
    }
}

/// Conversion of captured device frames to the requested output file.
pub(crate) struct WavJob {
    pub(crate) samples: Vec<f32>,
    pub(crate) device_rate: u32,
    pub(crate) device_channels: u16,
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
    pub(crate) path: PathBuf,
}

impl WavJob {
    /// Downmix, resample, re-channel and write. Returns the written duration.
    #[track_caller]
    pub(crate) fn write(self) -> CoreResult<u64> {
        let mono = downmix(&self.samples, self.device_channels);
        let converted = Resampler::new(self.device_rate, self.sample_rate)?.convert(&mono)?;
        let frames = converted.len() as u64;
        let interleaved = upmix(&converted, self.channels);

        write_wav(&self.path, &interleaved, self.sample_rate, self.channels)?;

        Ok(frames * 1000 / u64::from(self.sample_rate.max(1)))
    }
}

#[track_caller]
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> CoreResult<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: WAV_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let wav_error = |e: hound::Error| CaptureError::ResourceError {
        reason: format!("Failed to write {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_error)?;
    for &sample in samples {
        let pcm = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(pcm).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)?;

    Ok(())
}
