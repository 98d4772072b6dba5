//! Vision model failover chain
//!
//! Tries a ranked list of models until one returns a non-empty answer. The
//! preferred model goes first, then every vision-capable model in the table,
//! then text-only models as a last resort (they receive a disclaimer instead
//! of the image). Attempts are strictly sequential: first success wins, no
//! model is retried, and nothing is remembered between calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::agent::llm::{ChatCompletion, ChatMessage, CompletionOptions};
use crate::security::{CredentialSet, Provider};

/// Appended to the query for models that cannot see the image
pub const TEXT_ONLY_DISCLAIMER: &str = "Note: I would analyze your image, but I'm currently using a non-vision model as a fallback. Please try again later when vision models are available.";

/// Opening of the answer returned when every candidate failed
pub const EXHAUSTED_APOLOGY: &str = "I apologize, but I'm currently unable to analyze your image. Our vision analysis service is temporarily unavailable. Please try again later or consult with a healthcare professional directly.";

/// What a model can take as input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Accepts text plus inlined images
    Vision,
    /// Text only; gets the disclaimer instead of the image
    TextOnly,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Vision => write!(f, "vision"),
            Capability::TextOnly => write!(f, "text-only"),
        }
    }
}

/// One entry in the fallback table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    /// Provider-specific model identifier
    pub id: String,
    pub capability: Capability,
}

impl ModelCandidate {
    pub fn vision(id: impl Into<String>) -> Self {
        Self { id: id.into(), capability: Capability::Vision }
    }

    pub fn text_only(id: impl Into<String>) -> Self {
        Self { id: id.into(), capability: Capability::TextOnly }
    }
}

/// Built-in table, most preferred first
pub fn default_candidates() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::vision("meta-llama/llama-4-scout-17b-16e-instruct"),
        ModelCandidate::vision("llama-3.2-90b-vision-preview"),
        ModelCandidate::vision("claude-3-5-sonnet-20240620"),
        ModelCandidate::vision("gemini-1.5-pro-latest"),
        ModelCandidate::text_only("llama-3.1-8b-instant"),
    ]
}

/// Base64 image plus its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: String,
}

impl EncodedImage {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self { data: data.into(), media_type: media_type.into() }
    }
}

/// Why a single candidate attempt failed (used for logging only)
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    RateLimit,
    ModelDown,
    AuthError,
    ContextOverflow,
    Timeout,
    EmptyResponse,
    Unknown(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RateLimit => write!(f, "rate_limit"),
            FailureKind::ModelDown => write!(f, "model_down"),
            FailureKind::AuthError => write!(f, "auth_error"),
            FailureKind::ContextOverflow => write!(f, "context_overflow"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::EmptyResponse => write!(f, "empty_response"),
            FailureKind::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// Classify an error from the API response
pub fn classify_error(error_str: &str) -> FailureKind {
    let lower = error_str.to_lowercase();

    if lower.contains("rate limit") || lower.contains("429") || lower.contains("too many requests") {
        FailureKind::RateLimit
    } else if lower.contains("model not available")
        || lower.contains("decommissioned")
        || lower.contains("model_not_found")
        || lower.contains("503")
        || lower.contains("502")
        || lower.contains("overloaded")
        || lower.contains("service unavailable")
    {
        FailureKind::ModelDown
    } else if lower.contains("401") || lower.contains("403")
        || lower.contains("unauthorized") || lower.contains("invalid api key")
    {
        FailureKind::AuthError
    } else if lower.contains("context length")
        || lower.contains("max tokens")
        || lower.contains("too long")
        || lower.contains("context_length_exceeded")
    {
        FailureKind::ContextOverflow
    } else if lower.contains("timed out") || lower.contains("timeout") {
        FailureKind::Timeout
    } else {
        FailureKind::Unknown(error_str.to_string())
    }
}

/// One failed attempt
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub model: String,
    pub kind: FailureKind,
    pub cause: String,
}

/// Result of one orchestration call
#[derive(Debug, Clone)]
pub enum VisionOutcome {
    /// A candidate answered
    Answered {
        model: String,
        capability: Capability,
        text: String,
        failures: Vec<AttemptFailure>,
    },
    /// No usable credential; nothing was attempted
    NotConfigured { message: String },
    /// Every candidate failed
    Exhausted {
        message: String,
        failures: Vec<AttemptFailure>,
    },
}

impl VisionOutcome {
    /// The text handed back to the patient
    pub fn text(&self) -> &str {
        match self {
            VisionOutcome::Answered { text, .. } => text,
            VisionOutcome::NotConfigured { message } => message,
            VisionOutcome::Exhausted { message, .. } => message,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            VisionOutcome::Answered { text, .. } => text,
            VisionOutcome::NotConfigured { message } => message,
            VisionOutcome::Exhausted { message, .. } => message,
        }
    }

    /// Number of remote calls made
    pub fn attempts(&self) -> usize {
        match self {
            VisionOutcome::Answered { failures, .. } => failures.len() + 1,
            VisionOutcome::NotConfigured { .. } => 0,
            VisionOutcome::Exhausted { failures, .. } => failures.len(),
        }
    }

    /// The most recent failure, if any
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        match self {
            VisionOutcome::Answered { failures, .. } | VisionOutcome::Exhausted { failures, .. } => {
                failures.last()
            }
            VisionOutcome::NotConfigured { .. } => None,
        }
    }
}

/// Message returned when the vision credential is missing
pub fn not_configured_message() -> String {
    format!(
        "ERROR: {} is not set or is using the default placeholder value.\n\nPlease add your actual Groq API key to the .env file. You can get an API key from {}",
        Provider::Groq.env_var(),
        Provider::Groq.signup_url(),
    )
}

/// Sequential vision failover
pub struct VisionQueryOrchestrator {
    credentials: Arc<CredentialSet>,
    client: Arc<dyn ChatCompletion>,
    candidates: Vec<ModelCandidate>,
    options: CompletionOptions,
    attempt_timeout: Duration,
    allow_text_only: bool,
}

impl VisionQueryOrchestrator {
    /// Create an orchestrator over the built-in candidate table
    pub fn new(credentials: Arc<CredentialSet>, client: Arc<dyn ChatCompletion>) -> Self {
        Self {
            credentials,
            client,
            candidates: default_candidates(),
            options: CompletionOptions::default(),
            attempt_timeout: Duration::from_secs(60),
            allow_text_only: true,
        }
    }

    /// Replace the candidate table
    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Bound each attempt
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Whether text-only models may answer an image request
    pub fn allow_text_only(mut self, allow: bool) -> Self {
        self.allow_text_only = allow;
        self
    }

    /// Build from loaded configuration
    pub fn from_config(
        credentials: Arc<CredentialSet>,
        client: Arc<dyn ChatCompletion>,
        config: &crate::config::Config,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(credentials, client)
            .with_candidates(config.models.candidate_table()?)
            .with_options(CompletionOptions {
                max_tokens: Some(config.models.max_tokens),
                temperature: Some(config.models.temperature),
            })
            .with_attempt_timeout(config.timeouts.request())
            .allow_text_only(config.models.allow_text_only_fallback))
    }

    /// The ordered chain for a request: preferred first, vision models, then text-only
    pub fn candidate_chain(&self, preferred_model: &str) -> Vec<ModelCandidate> {
        let mut chain: Vec<ModelCandidate> = Vec::with_capacity(self.candidates.len() + 1);

        if !preferred_model.trim().is_empty() {
            let preferred = self.candidates
                .iter()
                .find(|c| c.id == preferred_model)
                .cloned()
                .unwrap_or_else(|| ModelCandidate::vision(preferred_model));
            chain.push(preferred);
        }

        for candidate in &self.candidates {
            if !chain.iter().any(|c| c.id == candidate.id) {
                chain.push(candidate.clone());
            }
        }

        // Stable: keeps table order within each group
        let (mut ordered, text_only): (Vec<_>, Vec<_>) = chain
            .into_iter()
            .partition(|c| c.capability == Capability::Vision);
        if self.allow_text_only {
            ordered.extend(text_only);
        }
        ordered
    }

    /// Answer `query` about `image`, returning the text for the patient
    pub async fn analyze(&self, query: &str, image: &EncodedImage, preferred_model: &str) -> String {
        self.run(query, image, preferred_model).await.into_text()
    }

    /// Same as [`analyze`](Self::analyze) but keeps attempt details
    pub async fn run(&self, query: &str, image: &EncodedImage, preferred_model: &str) -> VisionOutcome {
        if !self.credentials.is_configured(Provider::Groq) {
            let message = not_configured_message();
            error!("{} is not set or is a placeholder; skipping vision analysis", Provider::Groq.env_var());
            return VisionOutcome::NotConfigured { message };
        }

        let chain = self.candidate_chain(preferred_model);
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for (i, candidate) in chain.iter().enumerate() {
            let messages = build_messages(candidate, query, image);
            info!(model = %candidate.id, capability = %candidate.capability, attempt = i + 1, "Attempting vision model");

            let result = tokio::time::timeout(
                self.attempt_timeout,
                self.client.complete(&candidate.id, messages, self.options),
            ).await;

            let failure = match result {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    if i > 0 {
                        info!("Failover succeeded: {} -> {} (attempt {})", chain[0].id, candidate.id, i + 1);
                    }
                    info!(model = %candidate.id, "Received response: {}...", crate::truncate_safe(&text, 100));
                    return VisionOutcome::Answered {
                        model: candidate.id.clone(),
                        capability: candidate.capability,
                        text,
                        failures,
                    };
                }
                Ok(Ok(_)) => AttemptFailure {
                    model: candidate.id.clone(),
                    kind: FailureKind::EmptyResponse,
                    cause: format!("model {} returned an empty response", candidate.id),
                },
                Ok(Err(e)) => {
                    let cause = format!("{:#}", e);
                    AttemptFailure {
                        model: candidate.id.clone(),
                        kind: classify_error(&cause),
                        cause,
                    }
                }
                Err(_) => AttemptFailure {
                    model: candidate.id.clone(),
                    kind: FailureKind::Timeout,
                    cause: format!(
                        "model {} timed out after {}s",
                        candidate.id,
                        self.attempt_timeout.as_secs()
                    ),
                },
            };

            warn!(model = %failure.model, kind = %failure.kind, "Error with model {}: {}", failure.model, failure.cause);
            failures.push(failure);
        }

        let last_cause = failures
            .last()
            .map(|f| f.cause.clone())
            .unwrap_or_else(|| "no candidate models configured".to_string());
        error!("All models failed. Last error: {}", last_cause);

        VisionOutcome::Exhausted {
            message: format!("{}\n\nTechnical details: {}", EXHAUSTED_APOLOGY, last_cause),
            failures,
        }
    }
}

/// Request body for one candidate
fn build_messages(candidate: &ModelCandidate, query: &str, image: &EncodedImage) -> Vec<ChatMessage> {
    match candidate.capability {
        Capability::Vision => vec![ChatMessage::user_with_image(query, &image.data, &image.media_type)],
        Capability::TextOnly => vec![ChatMessage::user(format!("{}\n\n{}", query, TEXT_ONLY_DISCLAIMER))],
    }
}
