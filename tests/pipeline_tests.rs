// End-to-end pipeline tests: recording file in, transcript file out
//
// A mock HTTP server stands in for the transcription API so the whole
// chunk/upload/assemble/write path runs for real.

use anyhow::Result;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use voicescribe::transcribe::{RetryPolicy, WhisperClient};
use voicescribe::{TranscriptStatus, TranscriptionPipeline};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1/audio/transcriptions";

fn write_wav(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn pipeline_for(
    server_uri: &str,
    transcripts_dir: &Path,
    max_concurrent: usize,
) -> TranscriptionPipeline {
    let client = WhisperClient::new(
        format!("{server_uri}{ENDPOINT}"),
        "sk-test",
        "whisper-1",
        Duration::from_secs(5),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        },
    )
    .expect("client should build");

    TranscriptionPipeline::new(
        Arc::new(client),
        Duration::from_secs(1),
        max_concurrent,
        transcripts_dir,
    )
}

#[tokio::test]
async fn test_pipeline_writes_ordered_transcript() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "segment text"})))
        .expect(3)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new()?;
    let audio_path = temp_dir.path().join("recording_20260102_030405.wav");
    write_wav(&audio_path, &vec![0i16; 8000 * 5 / 2], 8000, 1)?; // 2.5s at 8kHz

    let transcripts_dir = temp_dir.path().join("transcripts");
    let pipeline = pipeline_for(&server.uri(), &transcripts_dir, 2);

    let outcome = pipeline.transcribe_file(&audio_path).await?;

    assert_eq!(outcome.status, TranscriptStatus::Complete);
    assert_eq!(outcome.chunk_count, 3);
    assert_eq!(
        outcome.transcript_path,
        transcripts_dir.join("recording_20260102_030405.txt")
    );

    let contents = std::fs::read_to_string(&outcome.transcript_path)?;
    assert!(contents.starts_with("Recording: recording_20260102_030405\n"));
    assert!(contents.contains("Duration: 00:00:02\n"));
    assert!(contents.contains(&"=".repeat(50)));
    assert!(contents.contains("segment text\n\nsegment text\n\nsegment text"));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_marks_gaps_but_still_writes_transcript() -> Result<()> {
    let server = MockServer::start().await;

    // Sequential uploads: first chunk succeeds, second fails, third succeeds
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "first part"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "The server had an error", "type": "server_error"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "third part"})))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new()?;
    let audio_path = temp_dir.path().join("recording_20260102_040000.wav");
    write_wav(&audio_path, &vec![0i16; 8000 * 3], 8000, 1)?; // 3s -> 3 chunks

    let transcripts_dir = temp_dir.path().join("transcripts");
    let pipeline = pipeline_for(&server.uri(), &transcripts_dir, 1);

    let outcome = pipeline.transcribe_file(&audio_path).await?;

    assert_eq!(
        outcome.status,
        TranscriptStatus::PartialFailure {
            failed_indices: vec![1]
        }
    );

    let contents = std::fs::read_to_string(&outcome.transcript_path)?;
    assert!(contents.contains("first part"));
    assert!(contents.contains("[segment 2 could not be transcribed:"));
    assert!(contents.contains("third part"));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_auth_failure_stops_after_first_upload() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new()?;
    let audio_path = temp_dir.path().join("recording_20260102_050000.wav");
    write_wav(&audio_path, &vec![0i16; 8000 * 3], 8000, 1)?; // 3s -> 3 chunks

    let transcripts_dir = temp_dir.path().join("transcripts");
    let pipeline = pipeline_for(&server.uri(), &transcripts_dir, 1);

    let outcome = pipeline.transcribe_file(&audio_path).await?;

    assert_eq!(outcome.status, TranscriptStatus::TotalFailure);
    assert_eq!(outcome.characters, 0);

    // The transcript still exists, fully marked as gaps
    let contents = std::fs::read_to_string(&outcome.transcript_path)?;
    assert_eq!(contents.matches("could not be transcribed").count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_empty_recording_never_reaches_the_service() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "unreachable"})))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new()?;
    let audio_path = temp_dir.path().join("recording_20260102_060000.wav");
    write_wav(&audio_path, &[], 8000, 1)?;

    let transcripts_dir = temp_dir.path().join("transcripts");
    let pipeline = pipeline_for(&server.uri(), &transcripts_dir, 2);

    let err = pipeline.transcribe_file(&audio_path).await.unwrap_err();
    assert!(
        err.to_string().contains("no audio"),
        "Empty recordings should be reported as such, got: {err}"
    );
    Ok(())
}
