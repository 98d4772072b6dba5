//! HTTP handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::consultation::ArtifactKind;
use crate::security::Provider;
use crate::server::uploads::{save_upload, validated_extension, UploadForm};
use crate::server::ServerState;

/// Successful consultation
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub transcription: String,
    pub diagnosis: String,
    /// `/uploads/<file>`, or null when no audio could be produced
    pub audio_response: Option<String>,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub vision_model: String,
    pub vision_configured: bool,
    pub premium_voice_configured: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "status": "error",
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `POST /api/upload` with multipart `audio` and `image`
pub async fn upload_handler(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Response {
    let form = match UploadForm::read(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected upload: {:#}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("{:#}", e));
        }
    };

    let (Some(audio), Some(image)) = (form.audio, form.image) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing audio or image file");
    };

    if audio.file_name.is_empty() || image.file_name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No selected file");
    }

    let (Some(audio_ext), Some(image_ext)) = (
        validated_extension(&audio, ArtifactKind::Audio),
        validated_extension(&image, ArtifactKind::Image),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid file type");
    };

    let upload_dir = &state.config.server.upload_dir;
    let saved = async {
        let audio_path = save_upload(upload_dir, &audio, &audio_ext).await?;
        let image_path = save_upload(upload_dir, &image, &image_ext).await?;
        anyhow::Ok((audio_path, image_path))
    }
    .await;
    let (audio_path, image_path) = match saved {
        Ok(paths) => paths,
        Err(e) => {
            error!("Failed to store upload: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing files: {:#}", e),
            );
        }
    };

    info!("Processing consultation: audio={} image={}", audio_path.display(), image_path.display());

    match state.consultation.diagnose(&audio_path, &image_path).await {
        Ok(result) => {
            let audio_response = result
                .audio_response_path
                .as_deref()
                .and_then(|p| p.file_name())
                .map(|name| format!("/uploads/{}", name.to_string_lossy()));

            (
                StatusCode::OK,
                Json(UploadResponse {
                    status: "success",
                    transcription: result.transcript,
                    diagnosis: result.diagnosis,
                    audio_response,
                }),
            )
                .into_response()
        }
        Err(e) if e.is_client_error() => {
            warn!("Invalid consultation input: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Error processing files: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing files: {}", e),
            )
        }
    }
}

/// `GET /api/status`
pub async fn status_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let response = StatusResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        vision_model: state.config.models.vision.clone(),
        vision_configured: state.credentials.is_configured(Provider::Groq),
        premium_voice_configured: state.credentials.is_configured(Provider::ElevenLabs),
    };

    (StatusCode::OK, Json(response)).into_response()
}
