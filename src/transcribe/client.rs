use async_trait::async_trait;
use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TranscriptionConfig;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription service rejected credentials: {0}")]
    Auth(String),
    #[error("transcription service rate limit exceeded")]
    RateLimited,
    #[error("network failure reaching transcription service: {0}")]
    Network(String),
    #[error("unparseable response from transcription service: {0}")]
    MalformedResponse(String),
    #[error("transcription service error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Retry budget and backoff for one chunk upload.
///
/// Rate limiting gets the full budget with doubling delays. A network failure
/// is retried once. Auth rejections, malformed responses, and other API
/// errors are not retried at all.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed for rate-limited requests
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each retry after that
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn attempts_allowed(&self, error: &TranscriptionError) -> u32 {
        match error {
            TranscriptionError::RateLimited => self.max_attempts.max(1),
            TranscriptionError::Network(_) => 2,
            _ => 1,
        }
    }

    fn delay_before_retry(&self, failed_attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(failed_attempt.saturating_sub(1))
    }
}

/// Anything that can turn a chunk of WAV audio into text.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(
        &self,
        wav_bytes: Vec<u8>,
        chunk_index: usize,
    ) -> Result<String, TranscriptionError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// HTTP client for the Whisper transcription endpoint.
pub struct WhisperClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl WhisperClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, TranscriptionError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TranscriptionError::Auth("no API key configured".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                TranscriptionError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            retry,
        })
    }

    pub fn from_config(cfg: &TranscriptionConfig) -> Result<Self, TranscriptionError> {
        let api_key = cfg.resolve_api_key().ok_or_else(|| {
            TranscriptionError::Auth(
                "no API key configured (set OPENAI_API_KEY or transcription.api_key)".to_string(),
            )
        })?;

        Self::new(
            cfg.api_url.clone(),
            api_key,
            cfg.model.clone(),
            cfg.request_timeout(),
            RetryPolicy::default(),
        )
    }

    async fn request_once(
        &self,
        wav_bytes: &[u8],
        chunk_index: usize,
    ) -> Result<String, TranscriptionError> {
        let part = multipart::Part::bytes(wav_bytes.to_vec())
            .file_name(format!("chunk-{chunk_index:03}.wav"))
            .mime_str("audio/wav")
            .map_err(|e| {
                TranscriptionError::Network(format!("failed to build upload request: {e}"))
            })?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("temperature", "0");

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscriptionError::Network(format!("request timed out: {e}"))
                } else {
                    TranscriptionError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Auth(api_error_message(&body)));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscriptionError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        let parsed: TranscriptionResponse = serde_json::from_str(&body).map_err(|e| {
            TranscriptionError::MalformedResponse(format!("{e} in body: {}", preview(&body)))
        })?;

        Ok(parsed.text.trim().to_string())
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperClient {
    async fn transcribe(
        &self,
        wav_bytes: Vec<u8>,
        chunk_index: usize,
    ) -> Result<String, TranscriptionError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!("Transcribing chunk {} (attempt {})", chunk_index, attempt);

            match self.request_once(&wav_bytes, chunk_index).await {
                Ok(text) => {
                    debug!("Chunk {} transcribed: {} chars", chunk_index, text.len());
                    return Ok(text);
                }
                Err(err) => {
                    if attempt >= self.retry.attempts_allowed(&err) {
                        return Err(err);
                    }

                    let delay = self.retry.delay_before_retry(attempt);
                    warn!(
                        "Chunk {} attempt {} failed ({}), retrying in {:?}",
                        chunk_index, attempt, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Pull the human-readable message out of an API error body, falling back to
/// the raw text when it is not the usual JSON shape.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "no error detail provided".to_string(),
        Err(_) => preview(body),
    }
}

fn preview(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    if body.chars().count() <= MAX_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
