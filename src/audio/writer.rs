use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::backend::CapturedAudio;

/// Writes finished captures to disk as timestamp-named WAV files.
pub struct RecordingWriter {
    recordings_dir: PathBuf,
}

impl RecordingWriter {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Result<Self> {
        let recordings_dir = recordings_dir.into();
        fs::create_dir_all(&recordings_dir).context("Failed to create recordings directory")?;
        Ok(Self { recordings_dir })
    }

    /// Write the capture as `recording_<timestamp>.wav` and return its path.
    pub fn write(&self, audio: &CapturedAudio) -> Result<PathBuf> {
        if audio.is_empty() {
            anyhow::bail!("Refusing to write an empty recording");
        }

        let filename = format!("recording_{}.wav", audio.started_at.format("%Y%m%d_%H%M%S"));
        let path = self.recordings_dir.join(filename);

        let spec = hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for &sample in &audio.samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;

        info!(
            "Recording saved: {} ({:.1}s, {} samples)",
            path.display(),
            audio.duration_seconds(),
            audio.samples.len()
        );

        Ok(path)
    }
}
