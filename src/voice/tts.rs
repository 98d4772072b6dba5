//! Text-to-Speech (TTS) Module
//!
//! Two remote providers, both returning MP3 bytes:
//!
//! ```text
//! ElevenLabs (API key, high fidelity)  ──fails──▶  Google translate TTS (no key)
//! ```
//!
//! The fallback policy itself lives in [`crate::voice::synthesis`].

use anyhow::{Result, Context, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::security::{CredentialSet, Provider};

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const GOOGLE_TTS_BASE_URL: &str = "https://translate.google.com";

/// Longest text the translate endpoint accepts per request
pub const GOOGLE_TTS_MAX_CHARS: usize = 100;

/// A remote speech synthesizer producing MP3
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Short provider name for logs and fallback notes
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs text-to-speech
pub struct ElevenLabsTts {
    client: Client,
    credentials: Arc<CredentialSet>,
    base_url: String,
    voice_id: String,
    model_id: String,
    output_format: String,
}

impl ElevenLabsTts {
    pub fn new(
        credentials: Arc<CredentialSet>,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        let base_url = std::env::var("ELEVENLABS_BASE_URL")
            .unwrap_or_else(|_| ELEVENLABS_BASE_URL.to_string());
        Self {
            client: Client::new(),
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
            output_format: output_format.into(),
        }
    }

    /// Build from loaded configuration
    pub fn from_config(credentials: Arc<CredentialSet>, config: &crate::config::Config) -> Result<Self> {
        let mut tts = Self::new(
            credentials,
            config.voice.voice_id.clone(),
            config.voice.tts_model.clone(),
            config.voice.output_format.clone(),
        );
        tts.client = http_client(config.timeouts.request())?;
        Ok(tts)
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsTts {
    fn name(&self) -> &str {
        "ElevenLabs"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let Some(api_key) = self.credentials.get(Provider::ElevenLabs) else {
            bail!("{} is not set", Provider::ElevenLabs.env_var());
        };
        if text.trim().is_empty() {
            bail!("Cannot synthesize empty text");
        }

        info!("Sending text-to-speech request to ElevenLabs API with voice: {}", self.voice_id);

        let response = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, self.voice_id))
            .query(&[("output_format", self.output_format.as_str())])
            .header("xi-api-key", api_key)
            .header("accept", "audio/mpeg")
            .json(&ElevenLabsRequest { text, model_id: &self.model_id })
            .send()
            .await
            .context("Failed to connect to ElevenLabs")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("ElevenLabs TTS error ({}): {}", status, body);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read ElevenLabs response")?
            .to_vec();

        if bytes.is_empty() {
            bail!("ElevenLabs returned no audio");
        }
        Ok(bytes)
    }
}

/// Google translate text-to-speech; needs no key
pub struct GoogleTts {
    client: Client,
    base_url: String,
    language: String,
}

impl GoogleTts {
    pub fn new(language: impl Into<String>) -> Self {
        let base_url = std::env::var("GOOGLE_TTS_BASE_URL")
            .unwrap_or_else(|_| GOOGLE_TTS_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.into(),
        }
    }

    /// Build from loaded configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let mut tts = Self::new(config.voice.language.clone());
        tts.client = http_client(config.timeouts.request())?;
        Ok(tts)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        let response = self
            .client
            .get(format!("{}/translate_tts", self.base_url))
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
                ("ttsspeed", "1"),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .header("user-agent", "Mozilla/5.0")
            .send()
            .await
            .context("Failed to connect to Google TTS")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Google TTS error ({}): {}", status, crate::truncate_safe(&body, 200));
        }

        Ok(response
            .bytes()
            .await
            .context("Failed to read Google TTS response")?
            .to_vec())
    }
}

#[async_trait]
impl SpeechProvider for GoogleTts {
    fn name(&self) -> &str {
        "Google TTS"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let chunks = split_for_tts(text, GOOGLE_TTS_MAX_CHARS);
        if chunks.is_empty() {
            bail!("Cannot synthesize empty text");
        }

        debug!(chunks = chunks.len(), "Synthesizing with Google TTS");

        // MP3 frames concatenate into a playable stream
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let bytes = self.fetch_chunk(chunk, idx, chunks.len()).await?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            bail!("Google TTS returned no audio");
        }
        Ok(audio)
    }
}

/// Split text into pieces of at most `max_chars` characters
///
/// Prefers sentence ends, then word gaps; a single word longer than the limit
/// is hard-split. Whitespace is collapsed and empty pieces are dropped.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    for sentence in split_sentences(text) {
        let mut current = String::new();
        for word in sentence.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();

            if word_len > max_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                for piece in chars.chunks(max_chars) {
                    chunks.push(piece.iter().collect());
                }
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
            } else if current_len + 1 + word_len <= max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                chunks.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }

    chunks
}

/// Sentences keep their terminating punctuation
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?' | '\n') {
            let end = i + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
