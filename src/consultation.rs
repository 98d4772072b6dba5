//! Consultation pipeline
//!
//! One request, strictly sequential:
//!
//! ```text
//! recording ─▶ Transcriber ─▶ build_query ─┐
//! photo ─────▶ encode_image ───────────────┴▶ VisionQueryOrchestrator ─▶ SpeechSynthesisOrchestrator
//! ```
//!
//! Only invalid input and local I/O surface as [`ConsultationError`]; provider
//! trouble degrades into fallback text or a missing audio path.

use base64::Engine;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::agent::failover::{EncodedImage, VisionQueryOrchestrator};
use crate::agent::llm::{ChatClient, ChatCompletion, ProviderConfig};
use crate::agent::prompt::build_query;
use crate::config::Config;
use crate::security::{CredentialSet, Provider};
use crate::voice::synthesis::SpeechSynthesisOrchestrator;
use crate::voice::whisper::{GroqWhisper, Transcriber};

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const ALLOWED_AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "ogg", "webm"];

#[derive(Error, Debug)]
pub enum ConsultationError {
    #[error("Missing {0} file")]
    MissingInput(ArtifactKind),

    #[error("Unsupported {0} format: {1}")]
    UnsupportedFormat(ArtifactKind, String),

    #[error("The {0} file is empty")]
    EmptyInput(ArtifactKind),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsultationError {
    /// Caller sent something unusable, as opposed to a server-side fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConsultationError::MissingInput(_)
                | ConsultationError::UnsupportedFormat(..)
                | ConsultationError::EmptyInput(_)
        )
    }
}

/// The two uploads a consultation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Audio,
    Image,
}

impl ArtifactKind {
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            ArtifactKind::Audio => ALLOWED_AUDIO_EXTENSIONS,
            ArtifactKind::Image => ALLOWED_IMAGE_EXTENSIONS,
        }
    }

    /// Lowercased extension of `file_name` if this kind accepts it
    pub fn accepted_extension(&self, file_name: &str) -> Option<String> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions().contains(&ext.as_str()).then_some(ext)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Audio => write!(f, "audio"),
            ArtifactKind::Image => write!(f, "image"),
        }
    }
}

/// What the patient gets back
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub transcript: String,
    pub diagnosis: String,
    /// `None` when no audio could be produced
    pub audio_response_path: Option<PathBuf>,
}

pub struct Consultation {
    transcriber: Arc<dyn Transcriber>,
    vision: VisionQueryOrchestrator,
    speech: SpeechSynthesisOrchestrator,
    output_dir: PathBuf,
    preferred_model: String,
}

impl Consultation {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        vision: VisionQueryOrchestrator,
        speech: SpeechSynthesisOrchestrator,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transcriber,
            vision,
            speech,
            output_dir: output_dir.into(),
            preferred_model: String::new(),
        }
    }

    /// Model tried before the rest of the table
    pub fn with_preferred_model(mut self, model: impl Into<String>) -> Self {
        self.preferred_model = model.into();
        self
    }

    /// Wire the real providers from configuration
    pub fn from_config(credentials: Arc<CredentialSet>, config: &Config) -> anyhow::Result<Self> {
        let api_key = credentials.get(Provider::Groq).unwrap_or_default().to_string();
        let chat: Arc<dyn ChatCompletion> =
            Arc::new(ChatClient::with_timeout(ProviderConfig::groq(api_key), config.timeouts.request())?);

        let transcriber: Arc<dyn Transcriber> =
            Arc::new(GroqWhisper::from_config(credentials.clone(), config)?);
        let vision = VisionQueryOrchestrator::from_config(credentials.clone(), chat, config)?;
        let speech = SpeechSynthesisOrchestrator::from_config(credentials, config)?;

        Ok(Self::new(transcriber, vision, speech, config.server.upload_dir.clone())
            .with_preferred_model(config.models.vision.clone()))
    }

    /// Recording + photo in, transcript + diagnosis + optional audio out
    pub async fn diagnose(&self, audio: &Path, image: &Path) -> Result<Diagnosis, ConsultationError> {
        check_artifact(audio, ArtifactKind::Audio).await?;
        check_artifact(image, ArtifactKind::Image).await?;

        let encoded = encode_image(image).await?;

        let transcript = self
            .transcriber
            .transcribe(audio)
            .await
            .map_err(|e| ConsultationError::Transcription(format!("{:#}", e)))?;
        info!("Transcription: {}", transcript);

        let query = build_query(&transcript);
        let diagnosis = self.vision.analyze(&query, &encoded, &self.preferred_model).await;
        info!("Doctor's response: {}", crate::truncate_safe(&diagnosis, 100));

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join(format!("{}.wav", uuid::Uuid::new_v4()));
        let audio_response_path = self.speech.synthesize(&diagnosis, &output_path).await;

        Ok(Diagnosis { transcript, diagnosis, audio_response_path })
    }
}

/// Present, allowed extension, non-empty
async fn check_artifact(path: &Path, kind: ArtifactKind) -> Result<(), ConsultationError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(ConsultationError::MissingInput(kind))?;

    if kind.accepted_extension(&file_name).is_none() {
        return Err(ConsultationError::UnsupportedFormat(kind, file_name));
    }

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConsultationError::MissingInput(kind));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(ConsultationError::MissingInput(kind));
    }
    if metadata.len() == 0 {
        return Err(ConsultationError::EmptyInput(kind));
    }
    Ok(())
}

/// Base64 payload with the media type of the bytes actually present
pub async fn encode_image(path: &Path) -> Result<EncodedImage, ConsultationError> {
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(ConsultationError::EmptyInput(ArtifactKind::Image));
    }

    let format = image::guess_format(&bytes).map_err(|_| {
        ConsultationError::UnsupportedFormat(ArtifactKind::Image, path.display().to_string())
    })?;
    let media_type = match format {
        image::ImageFormat::Png => "image/png",
        image::ImageFormat::Jpeg => "image/jpeg",
        image::ImageFormat::Gif => "image/gif",
        image::ImageFormat::WebP => "image/webp",
        other => {
            return Err(ConsultationError::UnsupportedFormat(
                ArtifactKind::Image,
                format!("{:?}", other),
            ));
        }
    };

    let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(EncodedImage::new(data, media_type))
}
