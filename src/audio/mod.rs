pub mod backend;
pub mod capture;
pub mod chunk;
pub mod file;
pub mod writer;

pub use backend::{
    AudioFrame, AudioSource, CaptureBackend, CaptureBackendFactory, CaptureConfig, CapturedAudio,
};
pub use capture::{list_input_devices, CpalBackend};
pub use chunk::{AudioChunk, ChunkError, Chunker};
pub use file::{AudioFile, FileBackend};
pub use writer::RecordingWriter;
