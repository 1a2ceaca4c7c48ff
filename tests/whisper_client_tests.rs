// Integration tests for the Whisper API client
//
// These tests run against a local mock HTTP server to verify response
// handling and the retry policy. Mock expectations are checked on server
// shutdown, so retry counts are asserted by `expect(...)`.

use serde_json::json;
use std::time::Duration;
use voicescribe::transcribe::{
    RetryPolicy, TranscriptionBackend, TranscriptionError, WhisperClient,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1/audio/transcriptions";

fn test_client(server_uri: &str) -> WhisperClient {
    WhisperClient::new(
        format!("{server_uri}{ENDPOINT}"),
        "sk-test",
        "whisper-1",
        Duration::from_secs(5),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        },
    )
    .expect("client should build")
}

fn wav_fixture() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..160i16 {
            writer.write_sample(i * 3).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[tokio::test]
async fn test_successful_transcription_returns_trimmed_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"text": " hello world \n"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let text = client
        .transcribe(wav_fixture(), 0)
        .await
        .expect("transcription should succeed");

    assert_eq!(text, "hello world");
}

#[tokio::test]
async fn test_auth_rejection_is_fatal_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.transcribe(wav_fixture(), 0).await.unwrap_err();

    match err {
        TranscriptionError::Auth(message) => {
            assert!(message.contains("Incorrect API key"), "got: {message}")
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_backs_off_then_succeeds() {
    let server = MockServer::start().await;

    // First two attempts are throttled, the third goes through
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "made it"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let text = client
        .transcribe(wav_fixture(), 0)
        .await
        .expect("should succeed after backoff");

    assert_eq!(text, "made it");
}

#[tokio::test]
async fn test_rate_limit_exhausts_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.transcribe(wav_fixture(), 0).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::RateLimited));
}

#[tokio::test]
async fn test_timeout_is_retried_exactly_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"text": "too late"}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = WhisperClient::new(
        format!("{}{ENDPOINT}", server.uri()),
        "sk-test",
        "whisper-1",
        Duration::from_millis(50),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        },
    )
    .expect("client should build");

    let err = client.transcribe(wav_fixture(), 0).await.unwrap_err();
    assert!(matches!(err, TranscriptionError::Network(_)));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "The server had an error", "type": "server_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.transcribe(wav_fixture(), 0).await.unwrap_err();

    match err {
        TranscriptionError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("server had an error"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_success_body_is_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.transcribe(wav_fixture(), 0).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_missing_text_field_is_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "wrong shape"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.transcribe(wav_fixture(), 0).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::MalformedResponse(_)));
}
