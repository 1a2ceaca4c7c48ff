use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::audio::{AudioFile, Chunker};
use crate::config::Config;
use crate::transcribe::{
    TranscriptAssembler, TranscriptStatus, TranscriptionBackend, TranscriptionError, WhisperClient,
};

/// Result of running a recording through the transcription pipeline.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub transcript_path: PathBuf,
    pub status: TranscriptStatus,
    pub chunk_count: usize,
    pub characters: usize,
}

/// Drives a saved recording through chunking, transcription, and transcript
/// assembly.
pub struct TranscriptionPipeline {
    backend: Arc<dyn TranscriptionBackend>,
    max_chunk: Duration,
    max_concurrent: usize,
    transcripts_dir: PathBuf,
}

impl TranscriptionPipeline {
    pub fn new(
        backend: Arc<dyn TranscriptionBackend>,
        max_chunk: Duration,
        max_concurrent: usize,
        transcripts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            max_chunk,
            max_concurrent,
            transcripts_dir: transcripts_dir.into(),
        }
    }

    /// Build the standard Whisper-backed pipeline from configuration.
    ///
    /// Fails with an auth error when no API key is configured, so callers can
    /// keep the recording and skip transcription.
    pub fn from_config(config: &Config) -> Result<Self, TranscriptionError> {
        let client = WhisperClient::from_config(&config.transcription)?;

        Ok(Self::new(
            Arc::new(client),
            config.transcription.max_chunk(),
            config.transcription.max_concurrent_requests,
            config.storage.transcripts_path(),
        ))
    }

    /// Transcribe a saved recording and write its transcript file.
    ///
    /// The transcript is written even when some or all chunks failed; the
    /// outcome's status says how much of it is real text.
    pub async fn transcribe_file(&self, audio_path: &Path) -> Result<PipelineOutcome> {
        info!("Transcribing recording: {}", audio_path.display());

        let file = AudioFile::open(audio_path)?;
        let chunks = Chunker::new(self.max_chunk).split(&file)?;

        let assembler = TranscriptAssembler::new(Arc::clone(&self.backend), self.max_concurrent);
        let transcript = assembler.assemble(&file, &chunks).await;

        let recording_name = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());

        let transcript_path =
            transcript.write(&self.transcripts_dir, &recording_name, file.duration_seconds)?;

        let characters = transcript.character_count();

        Ok(PipelineOutcome {
            transcript_path,
            status: transcript.status,
            chunk_count: chunks.len(),
            characters,
        })
    }
}
