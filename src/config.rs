use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable checked before the config file for the API key.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory where recorded WAV files are written
    pub recordings_dir: String,
    /// Directory where transcript text files are written
    pub transcripts_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            recordings_dir: "~/.voicescribe/recordings".to_string(),
            transcripts_dir: "~/.voicescribe/transcripts".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn recordings_path(&self) -> PathBuf {
        expand_path(&self.recordings_dir)
    }

    pub fn transcripts_path(&self) -> PathBuf {
        expand_path(&self.transcripts_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; None selects the system default
    pub device: Option<String>,
    /// Preferred sample rate for capture
    pub sample_rate: u32,
    /// Channel count recordings are stored with (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44100,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Speech-to-text endpoint URL
    pub api_url: String,
    /// Model name sent with each request
    pub model: String,
    /// API key; the OPENAI_API_KEY environment variable takes precedence
    pub api_key: Option<String>,
    /// Recordings longer than this are split into sequential chunks
    pub max_chunk_secs: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Upper bound on concurrent chunk uploads
    pub max_concurrent_requests: usize,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key: None,
            // 240s of 16-bit mono at 44.1kHz is ~21MB, under the API's 25MB upload cap
            max_chunk_secs: 240,
            request_timeout_secs: 60,
            max_concurrent_requests: 4,
        }
    }
}

impl TranscriptionConfig {
    /// Resolve the API key: environment first, then the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    pub fn max_chunk(&self) -> Duration {
        Duration::from_secs(self.max_chunk_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn pick_api_key(env_key: Option<String>, file_key: Option<&str>) -> Option<String> {
    if let Some(key) = env_key {
        if !key.trim().is_empty() {
            return Some(key);
        }
    }
    file_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

impl Config {
    /// Load configuration, layering an optional file under VOICESCRIBE_* env vars.
    ///
    /// With no explicit path, a `voicescribe.{toml,json,yaml}` file in the
    /// working directory is used if present; every field has a default, so a
    /// missing file is fine.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::with_name(p).required(true),
            None => config::File::with_name("voicescribe").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("VOICESCRIBE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = Config::default();
        assert_eq!(cfg.audio.sample_rate, 44100);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.transcription.model, "whisper-1");
        assert_eq!(cfg.transcription.max_chunk_secs, 240);
        assert_eq!(cfg.transcription.max_concurrent_requests, 4);
        assert!(cfg.transcription.api_key.is_none());
    }

    #[test]
    fn env_key_takes_precedence_over_file_key() {
        let key = pick_api_key(Some("sk-env".to_string()), Some("sk-file"));
        assert_eq!(key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn blank_env_key_falls_back_to_file_key() {
        let key = pick_api_key(Some("   ".to_string()), Some("sk-file"));
        assert_eq!(key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn missing_keys_resolve_to_none() {
        assert_eq!(pick_api_key(None, None), None);
        assert_eq!(pick_api_key(None, Some("  ")), None);
    }

    #[test]
    fn tilde_paths_are_expanded() {
        let storage = StorageConfig::default();
        let path = storage.recordings_path();
        assert!(!path.to_string_lossy().starts_with('~'));
    }
}
