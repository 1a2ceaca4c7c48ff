use crate::audio::AudioSource;

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where audio comes from (microphone or file replay)
    pub source: AudioSource,

    /// Input device name; None selects the system default
    pub device: Option<String>,

    /// Preferred sample rate for capture
    pub sample_rate: u32,

    /// Channel count the captured buffer is normalized to
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source: AudioSource::Microphone,
            device: None,
            sample_rate: 44100,
            channels: 1, // Mono is enough for speech
        }
    }
}
