use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};

/// A fully loaded recording
pub struct AudioFile {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "Expected 16-bit PCM WAV, got {:?} with {} bits per sample",
                spec.sample_format,
                spec.bits_per_sample
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let mut file = Self::from_samples(samples, spec.sample_rate, spec.channels);
        file.path = path.to_path_buf();

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            file.duration_seconds,
            file.sample_rate,
            file.channels,
            file.samples.len()
        );

        Ok(file)
    }

    /// Build an in-memory audio file from raw interleaved samples.
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        let duration_seconds =
            samples.len() as f64 / (sample_rate as f64 * channels.max(1) as f64);

        Self {
            path: PathBuf::new(),
            duration_seconds,
            sample_rate,
            channels,
            samples,
        }
    }

    /// Number of whole frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Capture backend that replays a WAV file as frames.
///
/// Replay is as fast as the receiver drains it; there is no realtime pacing.
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    task: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Self {
        Self {
            path,
            config,
            task: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            anyhow::bail!("Capture already started");
        }

        let file = AudioFile::open(&self.path)?;
        let frame_duration_ms = self.config.frame_duration_ms.max(1);

        let (tx, rx) = mpsc::channel(64);

        let task = tokio::spawn(async move {
            let per_frame_samples = (file.sample_rate as u64 * frame_duration_ms / 1000) as usize
                * file.channels as usize;
            let per_frame_samples = per_frame_samples.max(file.channels.max(1) as usize);

            let mut offset = 0;
            let mut timestamp_ms = 0u64;

            while offset < file.samples.len() {
                let end = (offset + per_frame_samples).min(file.samples.len());
                let frame = AudioFrame {
                    samples: file.samples[offset..end].to_vec(),
                    sample_rate: file.sample_rate,
                    channels: file.channels,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    break;
                }

                offset = end;
                timestamp_ms += frame_duration_ms;
            }

            debug!("File replay finished: {}", file.path.display());
        });

        self.task = Some(task);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            // Let replay finish so short files are delivered in full
            task.await.context("File replay task panicked")?;
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file replay"
    }
}
