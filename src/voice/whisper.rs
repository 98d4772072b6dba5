//! Whisper Speech-to-Text (STT) Module
//!
//! Sends the patient's recording to an OpenAI-compatible
//! `/audio/transcriptions` endpoint (Groq hosts `whisper-large-v3`).

use anyhow::{Result, Context, bail};
use async_trait::async_trait;
use reqwest::multipart;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::agent::llm::ProviderConfig;
use crate::security::{CredentialSet, Provider};

/// Default transcription model
pub const DEFAULT_STT_MODEL: &str = "whisper-large-v3";

/// Turns a recording into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Groq (or any OpenAI-compatible) Whisper client
pub struct GroqWhisper {
    client: reqwest::Client,
    credentials: Arc<CredentialSet>,
    base_url: String,
    model: String,
    language: Option<String>,
}

impl GroqWhisper {
    pub fn new(credentials: Arc<CredentialSet>, model: impl Into<String>) -> Self {
        // Key is read per call from the credential set; only the URL matters here
        let base_url = ProviderConfig::groq("").base_url;
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url,
            model: model.into(),
            language: None,
        }
    }

    /// Build from loaded configuration
    pub fn from_config(credentials: Arc<CredentialSet>, config: &crate::config::Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            ..Self::new(credentials, config.models.transcription.clone())
        }
        .with_language(config.voice.language.clone()))
    }

    /// Hint the spoken language (ISO-639-1)
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Transcriber for GroqWhisper {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let Some(api_key) = self.credentials.get(Provider::Groq) else {
            bail!(
                "{} is not set or is using the default placeholder value",
                Provider::Groq.env_var()
            );
        };

        let audio = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio_path.display()))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        debug!(model = %self.model, bytes = audio.len(), "Sending audio for transcription");

        let file_part = multipart::Part::bytes(audio)
            .file_name(file_name.clone())
            .mime_str(audio_mime(&file_name))
            .context("Invalid audio MIME type")?;

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", file_part);
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request to transcription provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Transcription API error ({}): {}", status, body);
        }

        let transcript = response
            .text()
            .await
            .context("Failed to read transcription response")?;

        let text = transcript.trim().to_string();
        info!(chars = text.len(), "Transcribed: \"{}\"", crate::truncate_safe(&text, 100));
        Ok(text)
    }
}

/// MIME type for an uploaded recording, by extension
pub fn audio_mime(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        _ => "audio/wav",
    }
}
