//! Chunk transcription and transcript assembly
//!
//! This module covers the path from saved audio to transcript file:
//! - `WhisperClient` uploads one chunk per request, with retry/backoff
//! - `TranscriptAssembler` runs chunks through a bounded worker pool and
//!   reassembles the fragments in chunk order
//! - `Transcript` renders and writes the final text file

mod assembler;
mod client;
mod transcript;

pub use assembler::TranscriptAssembler;
pub use client::{RetryPolicy, TranscriptionBackend, TranscriptionError, WhisperClient};
pub use transcript::{FragmentOutcome, Transcript, TranscriptFragment, TranscriptStatus};
