use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::file::AudioFile;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("recording contains no audio")]
    EmptyRecording,
    #[error("maximum chunk duration must be greater than zero")]
    InvalidMaxDuration,
    #[error("chunk range exceeds audio data")]
    ChunkOutOfBounds,
    #[error("failed to encode chunk as WAV: {0}")]
    Encode(#[from] hound::Error),
}

/// A contiguous slice of a recording, addressed in whole frames.
///
/// Chunks never split a frame, so channel interleaving survives the cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Position in the recording (0-based)
    pub index: usize,
    /// First frame of this chunk
    pub start_frame: usize,
    /// Number of frames in this chunk
    pub frame_count: usize,
    /// Sample rate of the source recording
    pub sample_rate: u32,
    /// Channel count of the source recording
    pub channels: u16,
}

impl AudioChunk {
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Encode this chunk as a standalone in-memory WAV file.
    pub fn to_wav_bytes(&self, file: &AudioFile) -> Result<Vec<u8>, ChunkError> {
        let channels = self.channels.max(1) as usize;
        let start = self.start_frame * channels;
        let end = start + self.frame_count * channels;
        let slice = file
            .samples
            .get(start..end)
            .ok_or(ChunkError::ChunkOutOfBounds)?;

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in slice {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }
}

/// Splits recordings into fixed-duration chunks for upload.
pub struct Chunker {
    max_chunk: Duration,
}

impl Chunker {
    pub fn new(max_chunk: Duration) -> Self {
        Self { max_chunk }
    }

    /// Split the recording into sequential chunks of at most the configured
    /// duration. Every chunk except possibly the last is full length, and the
    /// chunk frame counts sum to the recording's frame count exactly.
    pub fn split(&self, file: &AudioFile) -> Result<Vec<AudioChunk>, ChunkError> {
        if self.max_chunk.is_zero() {
            return Err(ChunkError::InvalidMaxDuration);
        }

        let total_frames = file.frame_count();
        if total_frames == 0 {
            return Err(ChunkError::EmptyRecording);
        }

        let frames_per_chunk =
            ((self.max_chunk.as_millis() * file.sample_rate as u128) / 1000) as usize;
        let frames_per_chunk = frames_per_chunk.max(1);

        let mut chunks = Vec::with_capacity(total_frames.div_ceil(frames_per_chunk));
        let mut start_frame = 0;

        while start_frame < total_frames {
            let frame_count = frames_per_chunk.min(total_frames - start_frame);
            chunks.push(AudioChunk {
                index: chunks.len(),
                start_frame,
                frame_count,
                sample_rate: file.sample_rate,
                channels: file.channels,
            });
            start_frame += frame_count;
        }

        debug!(
            "Split {:.1}s recording into {} chunk(s) of up to {}s",
            file.duration_seconds,
            chunks.len(),
            self.max_chunk.as_secs()
        );

        Ok(chunks)
    }
}
