use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::client::{TranscriptionBackend, TranscriptionError};
use super::transcript::{Transcript, TranscriptFragment, TranscriptStatus};
use crate::audio::{AudioChunk, AudioFile};

/// Transcribes chunks through a bounded worker pool and assembles the
/// fragments in chunk order.
///
/// Completion order does not matter: each fragment carries its chunk index
/// and is placed into its slot, so an out-of-order finish can never reorder
/// the transcript. An auth failure trips a flag that makes every not yet
/// started chunk resolve as failed without calling the service again.
pub struct TranscriptAssembler {
    backend: Arc<dyn TranscriptionBackend>,
    max_concurrent: usize,
}

impl TranscriptAssembler {
    pub fn new(backend: Arc<dyn TranscriptionBackend>, max_concurrent: usize) -> Self {
        Self {
            backend,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn assemble(&self, file: &AudioFile, chunks: &[AudioChunk]) -> Transcript {
        let total = chunks.len();
        let abort = Arc::new(AtomicBool::new(false));

        info!(
            "Transcribing {} chunk(s) with up to {} in flight",
            total, self.max_concurrent
        );

        let jobs = chunks.iter().map(|chunk| {
            // Encoding happens when the job is pulled into the pool, so at
            // most max_concurrent chunks are held in memory as WAV bytes.
            let encoded = chunk.to_wav_bytes(file);
            let backend = Arc::clone(&self.backend);
            let abort = Arc::clone(&abort);
            let index = chunk.index;

            async move {
                if abort.load(Ordering::SeqCst) {
                    return TranscriptFragment::failed(
                        index,
                        "skipped after fatal authentication failure",
                    );
                }

                let wav_bytes = match encoded {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return TranscriptFragment::failed(
                            index,
                            format!("could not encode chunk audio: {e}"),
                        )
                    }
                };

                match backend.transcribe(wav_bytes, index).await {
                    Ok(text) => TranscriptFragment::text(index, text),
                    Err(err) => {
                        if matches!(err, TranscriptionError::Auth(_)) {
                            abort.store(true, Ordering::SeqCst);
                            warn!(
                                "Chunk {} failed with an auth error, aborting remaining chunks: {}",
                                index, err
                            );
                        } else {
                            warn!("Chunk {} failed: {}", index, err);
                        }
                        TranscriptFragment::failed(index, err.to_string())
                    }
                }
            }
        });

        let mut slots: Vec<Option<TranscriptFragment>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        let mut results = stream::iter(jobs).buffer_unordered(self.max_concurrent);
        while let Some(fragment) = results.next().await {
            let index = fragment.chunk_index;
            if index < total {
                slots[index] = Some(fragment);
            }
        }

        // Every slot is filled by construction; an empty one would mean a
        // job vanished, which still must surface as a marked gap.
        let fragments: Vec<TranscriptFragment> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| TranscriptFragment::failed(index, "no result recorded"))
            })
            .collect();

        let transcript = Transcript::from_fragments(fragments);

        match &transcript.status {
            TranscriptStatus::Complete => {
                info!("Transcription complete: {} chunk(s)", total);
            }
            TranscriptStatus::PartialFailure { failed_indices } => {
                warn!(
                    "Transcription partially failed: {} of {} chunk(s) failed (indices {:?})",
                    failed_indices.len(),
                    total,
                    failed_indices
                );
            }
            TranscriptStatus::TotalFailure => {
                warn!("Transcription failed for every chunk");
            }
        }

        transcript
    }
}
