//! Chat-completions client for OpenAI-compatible vision-language providers (Groq by default)

use anyhow::{Result, Context, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

// ============ Provider Configuration ============

/// Configuration for an LLM API provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., "https://api.groq.com/openai/v1")
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
}

impl ProviderConfig {
    /// Groq, honoring `GROQ_BASE_URL` when set
    pub fn groq(api_key: impl Into<String>) -> Self {
        let base_url = std::env::var("GROQ_BASE_URL")
            .unwrap_or_else(|_| GROQ_BASE_URL.to_string());
        Self::openai_compatible(api_key, base_url)
    }

    /// Any OpenAI-compatible endpoint
    pub fn openai_compatible(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

// ============ Multimodal Content Support ============

/// Content part for multimodal messages (text + images)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image URL for multimodal messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL or data URI (e.g., "data:image/png;base64,...")
    pub url: String,
}

impl ContentPart {
    /// Create a text content part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create an image content part from base64 data
    pub fn image_base64(base64_data: &str, media_type: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", media_type, base64_data),
            },
        }
    }
}

/// A chat message; `content` is either a plain string or an array of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(serde_json::json!(content.into())),
        }
    }

    /// Create a user message with multiple content parts
    pub fn user_multimodal(parts: Vec<ContentPart>) -> Self {
        let content_array: Vec<serde_json::Value> = parts.iter()
            .map(|p| serde_json::to_value(p).unwrap_or_default())
            .collect();
        Self {
            role: "user".to_string(),
            content: Some(serde_json::json!(content_array)),
        }
    }

    /// Create a user message with text plus an inlined image
    pub fn user_with_image(text: impl Into<String>, image_base64: &str, media_type: &str) -> Self {
        Self::user_multimodal(vec![
            ContentPart::text(text),
            ContentPart::image_base64(image_base64, media_type),
        ])
    }

    /// Whether any part of this message is an image
    pub fn has_image(&self) -> bool {
        match &self.content {
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .any(|p| p.get("type").and_then(|t| t.as_str()) == Some("image_url")),
            _ => false,
        }
    }

    /// Extract content as plain text, handling both string and array-of-content-parts formats.
    pub fn content_as_text(&self) -> Option<String> {
        self.content.as_ref().and_then(content_value_as_text)
    }
}

fn content_value_as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(parts) => {
            let texts: Vec<String> = parts.iter().filter_map(|part| {
                if part.get("type").and_then(|t| t.as_str()) == Some("text") {
                    part.get("text").and_then(|t| t.as_str()).map(|s| s.to_string())
                } else {
                    None
                }
            }).collect();
            if texts.is_empty() { None } else { Some(texts.join("")) }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(800),
            temperature: Some(0.7),
        }
    }
}

/// A provider that turns messages into a completion
///
/// Returns the raw completion text; an empty string is a valid `Ok` here and
/// it is up to the caller to decide whether that counts as an answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// LLM API client for OpenAI-compatible providers
#[derive(Clone)]
pub struct ChatClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl ChatClient {
    /// Create a client whose HTTP calls are bounded by `timeout`
    pub fn with_timeout(config: ProviderConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            provider: config,
        })
    }
}

#[async_trait]
impl ChatCompletion for ChatClient {
    /// Send a chat completion request
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self.client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .bearer_auth(&self.provider.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error ({}): {}", status, body);
        }

        let body = response.text().await.context("Failed to read response body")?;
        extract_completion_text(&body)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions body
pub fn extract_completion_text(body: &str) -> Result<String> {
    let raw_response: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| {
            anyhow::anyhow!("Failed to parse JSON response: {} (body: {})",
                e, crate::truncate_safe(body, 500))
        })?;

    if let Some(error) = raw_response.get("error") {
        bail!("LLM API error: {}", error);
    }

    let content = raw_response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(content_value_as_text)
        .unwrap_or_default();

    Ok(content)
}
