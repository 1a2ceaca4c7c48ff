use super::config::SessionConfig;
use super::stats::{SessionState, SessionStats};
use crate::audio::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CapturedAudio,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Accumulates frames from the capture backend.
///
/// Rate and channel count come from the first frame, since the device may
/// negotiate something other than the preferred values.
#[derive(Default)]
struct CaptureBuffer {
    samples: Vec<i16>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
}

/// A recording session: one capture backend, one background drain task, and
/// the buffer they fill. All state lives here; nothing is global.
pub struct RecordingSession {
    config: SessionConfig,
    state: SessionState,
    started_at: Option<DateTime<Local>>,
    backend: Option<Box<dyn CaptureBackend>>,
    buffer: Arc<Mutex<CaptureBuffer>>,
    drain_task: Option<JoinHandle<()>>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            started_at: None,
            backend: None,
            buffer: Arc::new(Mutex::new(CaptureBuffer::default())),
            drain_task: None,
        }
    }

    /// Start capturing into the session buffer.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Recording {
            warn!("Recording already started");
            return Ok(());
        }

        let capture_config = CaptureConfig {
            device: self.config.device.clone(),
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            ..CaptureConfig::default()
        };

        let mut backend = CaptureBackendFactory::create(self.config.source.clone(), capture_config)
            .context("Failed to create capture backend")?;

        info!("Starting capture via {}", backend.name());

        let mut audio_rx = backend
            .start()
            .await
            .context("Failed to start audio capture")?;

        let buffer = Arc::clone(&self.buffer);
        let target_channels = self.config.channels;

        let drain_task = tokio::spawn(async move {
            debug!("Capture drain task started");

            while let Some(frame) = audio_rx.recv().await {
                let frame = normalize_channels(frame, target_channels);

                let mut buf = buffer.lock().await;
                if buf.sample_rate.is_none() {
                    buf.sample_rate = Some(frame.sample_rate);
                    buf.channels = Some(frame.channels);
                }
                buf.samples.extend_from_slice(&frame.samples);
            }

            debug!("Capture drain task stopped");
        });

        self.backend = Some(backend);
        self.drain_task = Some(drain_task);
        self.started_at = Some(Local::now());
        self.state = SessionState::Recording;

        info!("Recording session started");
        Ok(())
    }

    /// Stop capturing and hand back the accumulated buffer.
    pub async fn stop(&mut self) -> Result<CapturedAudio> {
        if self.state != SessionState::Recording {
            anyhow::bail!("Session is not recording");
        }

        if let Some(mut backend) = self.backend.take() {
            backend
                .stop()
                .await
                .context("Failed to stop capture backend")?;
        }

        // The backend dropped its sender, so the drain task ends once the
        // channel is empty.
        if let Some(task) = self.drain_task.take() {
            task.await.context("Capture drain task panicked")?;
        }

        self.state = SessionState::Stopped;

        let mut buf = self.buffer.lock().await;
        let samples = std::mem::take(&mut buf.samples);
        let sample_rate = buf.sample_rate.take().unwrap_or(self.config.sample_rate);
        let channels = buf.channels.take().unwrap_or(self.config.channels);
        drop(buf);

        let started_at = self.started_at.unwrap_or_else(Local::now);

        info!(
            "Recording session stopped: {} samples captured",
            samples.len()
        );

        Ok(CapturedAudio {
            samples,
            sample_rate,
            channels,
            started_at,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Current session statistics
    pub async fn stats(&self) -> SessionStats {
        let samples_captured = self.buffer.lock().await.samples.len();

        let duration_secs = match self.started_at {
            Some(started_at) => {
                Local::now()
                    .signed_duration_since(started_at)
                    .num_milliseconds() as f64
                    / 1000.0
            }
            None => 0.0,
        };

        SessionStats {
            state: self.state,
            started_at: self.started_at,
            duration_secs,
            samples_captured,
        }
    }
}

/// Convert a frame to the target channel layout.
///
/// Only stereo to mono is supported; anything else passes through unchanged.
fn normalize_channels(frame: AudioFrame, target_channels: u16) -> AudioFrame {
    if frame.channels != target_channels && target_channels == 1 {
        return stereo_to_mono(frame);
    }
    frame
}

/// Convert stereo to mono by summing channels
fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame;
    }

    let mut mono_samples = Vec::with_capacity(frame.samples.len() / 2);

    // Sum left and right (no division, to preserve volume)
    for pair in frame.samples.chunks_exact(2) {
        let sum = pair[0] as i32 + pair[1] as i32;
        mono_samples.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    AudioFrame {
        samples: mono_samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}
