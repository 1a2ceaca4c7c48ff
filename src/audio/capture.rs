use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};

/// Frames buffered between the capture thread and the session drain task
const CHANNEL_CAPACITY: usize = 256;

/// Microphone capture backend built on cpal.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated OS thread
/// for the whole capture. Frames are handed to async land through a bounded
/// tokio channel; `try_send` keeps the realtime callback from ever blocking.
pub struct CpalBackend {
    config: CaptureConfig,
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    capturing: bool,
}

impl CpalBackend {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        // Probe the device up front so a missing microphone fails fast
        let device = resolve_input_device(config.device.as_deref())?;
        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        Ok(Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            capturing: false,
        })
    }
}

#[async_trait::async_trait]
impl CaptureBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            anyhow::bail!("Capture already started");
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);

        let config = self.config.clone();
        let worker = thread::spawn(move || run_capture(config, tx, stop, ready_tx));

        // Wait for the thread to report whether the stream opened
        let startup = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Capture startup task failed")?
            .context("Capture thread exited before reporting status")?;

        match startup {
            Ok(()) => {
                self.worker = Some(worker);
                self.capturing = true;
                Ok(rx)
            }
            Err(e) => {
                let _ = worker.join();
                Err(e)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        self.stop.store(true, Ordering::Relaxed);

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .context("Capture shutdown task failed")?
                .map_err(|_| anyhow::anyhow!("Capture thread panicked"))?;
        }

        self.capturing = false;
        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Capture thread panicked during drop");
            }
        }
    }
}

/// List input device names, marking the system default.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut names = Vec::new();
    for device in host
        .input_devices()
        .context("Failed to enumerate input devices")?
    {
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        if default_name.as_deref() == Some(name.as_str()) {
            names.push(format!("{name} (default)"));
        } else {
            names.push(name);
        }
    }

    Ok(names)
}

fn run_capture(
    config: CaptureConfig,
    tx: mpsc::Sender<AudioFrame>,
    stop: Arc<AtomicBool>,
    ready: std::sync::mpsc::Sender<Result<()>>,
) {
    let stream = match open_stream(&config, tx) {
        Ok(stream) => {
            if ready.send(Ok(())).is_err() {
                return;
            }
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // The stream delivers data through its callback; this thread only has to
    // stay alive and keep the stream from dropping until stop is requested.
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    debug!("Capture thread exiting");
}

fn open_stream(config: &CaptureConfig, tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream> {
    let device = resolve_input_device(config.device.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = negotiate_input_config(&device, config.sample_rate, config.channels)?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();

    info!(
        "Input stream open: {} ({} Hz, {} channels, {:?})",
        device_name, stream_config.sample_rate.0, stream_config.channels, sample_format
    );

    let stream = match sample_format {
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, tx)?,
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, tx)?,
        other => anyhow::bail!("Unsupported sample format: {other:?}"),
    };

    stream.play().context("Failed to start input stream")?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut frames_sent: u64 = 0;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if data.is_empty() {
                    return;
                }

                let samples = convert_samples(data);
                let timestamp_ms = frames_sent * 1000 / u64::from(sample_rate);
                frames_sent += (samples.len() / channels as usize) as u64;

                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms,
                };

                // Never block inside the audio callback
                if let Err(TrySendError::Full(_)) = tx.try_send(frame) {
                    warn!("Audio channel full, dropping {} samples", data.len());
                }
            },
            |err| warn!("Audio input stream error: {}", err),
            None,
        )
        .context("Failed to build input stream")?;

    Ok(stream)
}

/// Convert a device buffer to i16 regardless of its native sample format.
fn convert_samples<T>(data: &[T]) -> Vec<i16>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    data.iter().map(|&s| i16::from_sample(s)).collect()
}

fn resolve_input_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match name {
        Some(wanted) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .with_context(|| format!("Input device not found: {wanted}")),
        None => host
            .default_input_device()
            .context("No input device available"),
    }
}

fn negotiate_input_config(
    device: &cpal::Device,
    preferred_rate: u32,
    preferred_channels: u16,
) -> Result<cpal::SupportedStreamConfig> {
    if let Ok(mut ranges) = device.supported_input_configs() {
        if let Some(range) = ranges.find(|r| {
            r.channels() == preferred_channels
                && r.min_sample_rate().0 <= preferred_rate
                && preferred_rate <= r.max_sample_rate().0
        }) {
            return Ok(range.with_sample_rate(cpal::SampleRate(preferred_rate)));
        }
    }

    device
        .default_input_config()
        .context("Failed to get default input config")
}
