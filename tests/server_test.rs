//! HTTP surface driven through the router

mod common;

use arogya::agent::failover::VisionQueryOrchestrator;
use arogya::config::Config;
use arogya::consultation::Consultation;
use arogya::security::CredentialSet;
use arogya::server::{router, ServerState};
use arogya::voice::audio::AudioNormalizer;
use arogya::voice::synthesis::SpeechSynthesisOrchestrator;
use arogya::voice::tts::SpeechProvider;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{FakeSpeech, FixedTranscriber, ScriptedChat, SilentWavConverter, PNG_BYTES};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "arogya-test-boundary";

fn app(upload_dir: &Path, credentials: CredentialSet) -> axum::Router {
    let credentials = Arc::new(credentials);
    let chat = Arc::new(ScriptedChat::new(vec![Ok("Looks like mild eczema.")]));
    let baseline: Arc<dyn SpeechProvider> = Arc::new(FakeSpeech::working("Google TTS"));
    let speech = SpeechSynthesisOrchestrator::new(
        credentials.clone(),
        None,
        baseline,
        AudioNormalizer::with_converters(vec![Arc::new(SilentWavConverter)]),
    );
    let consultation = Consultation::new(
        Arc::new(FixedTranscriber("Is this serious?".to_string())),
        VisionQueryOrchestrator::new(credentials.clone(), chat),
        speech,
        upload_dir,
    );

    let mut config = Config::default();
    config.server.upload_dir = upload_dir.to_path_buf();
    router(ServerState::new(config, credentials, consultation))
}

fn keyed() -> CredentialSet {
    CredentialSet::new(Some("gsk_live".to_string()), None)
}

/// (field name, file name, bytes)
fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(app: axum::Router, parts: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_upload_success() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = upload(
        app(dir.path(), keyed()),
        &[("audio", "recording.wav", &b"RIFF-fake"[..]), ("image", "face.png", PNG_BYTES)],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["transcription"], "Is this serious?");
    assert_eq!(json["diagnosis"], "Looks like mild eczema.");

    let audio_url = json["audio_response"].as_str().unwrap();
    assert!(audio_url.starts_with("/uploads/"));
    assert!(audio_url.ends_with(".wav"));
    let file = dir.path().join(audio_url.trim_start_matches("/uploads/"));
    assert!(file.exists());
}

#[tokio::test]
async fn test_generated_audio_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), keyed());
    let (_, json) = upload(
        app.clone(),
        &[("audio", "recording.wav", &b"RIFF-fake"[..]), ("image", "face.png", PNG_BYTES)],
    )
    .await;

    let request = Request::builder()
        .uri(json["audio_response"].as_str().unwrap())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_field() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = upload(app(dir.path(), keyed()), &[("audio", "recording.wav", &b"RIFF"[..])]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Missing audio or image file");
}

#[tokio::test]
async fn test_empty_filename() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = upload(
        app(dir.path(), keyed()),
        &[("audio", "", &b""[..]), ("image", "face.png", PNG_BYTES)],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "No selected file");
}

#[tokio::test]
async fn test_invalid_file_type() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = upload(
        app(dir.path(), keyed()),
        &[("audio", "recording.wav", &b"RIFF"[..]), ("image", "notes.txt", &b"hello"[..])],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid file type");
}

#[tokio::test]
async fn test_status_reports_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder().uri("/api/status").body(Body::empty()).unwrap();

    let response = app(dir.path(), keyed()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["vision_configured"], true);
    assert_eq!(json["premium_voice_configured"], false);
}

#[tokio::test]
async fn test_index_page() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app(dir.path(), keyed()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/api/upload"));
}
