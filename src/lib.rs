pub mod audio;
pub mod config;
pub mod pipeline;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioChunk, AudioFile, AudioFrame, AudioSource, CaptureBackend, CaptureBackendFactory,
    CaptureConfig, CapturedAudio, ChunkError, Chunker, FileBackend, RecordingWriter,
};
pub use config::Config;
pub use pipeline::{PipelineOutcome, TranscriptionPipeline};
pub use session::{RecordingSession, SessionConfig, SessionState, SessionStats};
pub use transcribe::{
    FragmentOutcome, RetryPolicy, Transcript, TranscriptAssembler, TranscriptFragment,
    TranscriptStatus, TranscriptionBackend, TranscriptionError, WhisperClient,
};
