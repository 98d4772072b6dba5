//! Provider credentials
//!
//! A `CredentialSet` is snapshotted from the environment once at start-up and
//! then shared read-only (behind an `Arc`) by every orchestrator. Business
//! logic never reads `std::env` directly.

use std::env;
use std::fmt;

/// Environment variable holding the Groq key (vision + transcription)
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable holding the ElevenLabs key (primary speech)
pub const ELEVENLABS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Placeholder shipped in the sample `.env` for the Groq key
pub const GROQ_PLACEHOLDER: &str = "your_groq_api_key_here";

/// Placeholder shipped in the sample `.env` for the ElevenLabs key
pub const ELEVENLABS_PLACEHOLDER: &str = "your_elevenlabs_api_key_here";

/// Remote providers that take a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Groq: vision-language chat completions and Whisper transcription
    Groq,
    /// ElevenLabs: high-fidelity speech synthesis
    ElevenLabs,
}

impl Provider {
    /// Environment variable the key is read from
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Groq => GROQ_API_KEY_ENV,
            Provider::ElevenLabs => ELEVENLABS_API_KEY_ENV,
        }
    }

    /// Placeholder value that counts as "not configured"
    pub fn placeholder(&self) -> &'static str {
        match self {
            Provider::Groq => GROQ_PLACEHOLDER,
            Provider::ElevenLabs => ELEVENLABS_PLACEHOLDER,
        }
    }

    /// Where an operator can obtain a key
    pub fn signup_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://console.groq.com/",
            Provider::ElevenLabs => "https://elevenlabs.io",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Groq => write!(f, "Groq"),
            Provider::ElevenLabs => write!(f, "ElevenLabs"),
        }
    }
}

/// Immutable snapshot of provider API keys
#[derive(Clone, Default)]
pub struct CredentialSet {
    groq: Option<String>,
    elevenlabs: Option<String>,
}

impl CredentialSet {
    /// Build from explicit values (tests, embedding applications)
    pub fn new(groq: Option<String>, elevenlabs: Option<String>) -> Self {
        Self { groq, elevenlabs }
    }

    /// Snapshot the current process environment
    pub fn from_env() -> Self {
        Self {
            groq: env::var(GROQ_API_KEY_ENV).ok(),
            elevenlabs: env::var(ELEVENLABS_API_KEY_ENV).ok(),
        }
    }

    /// An empty set: every provider reports as unconfigured
    pub fn empty() -> Self {
        Self::default()
    }

    /// The raw value for a provider, if any was supplied
    fn raw(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Groq => self.groq.as_deref(),
            Provider::ElevenLabs => self.elevenlabs.as_deref(),
        }
    }

    /// The key for a provider, or `None` if absent, blank or a placeholder
    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.raw(provider)
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != provider.placeholder())
    }

    /// Whether a usable key exists for the provider
    pub fn is_configured(&self, provider: Provider) -> bool {
        self.get(provider).is_some()
    }

    /// Whether the provider was given its sample placeholder verbatim
    pub fn is_placeholder(&self, provider: Provider) -> bool {
        self.raw(provider).map(str::trim) == Some(provider.placeholder())
    }
}

// Keys never reach logs through Debug
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("groq", &self.is_configured(Provider::Groq))
            .field("elevenlabs", &self.is_configured(Provider::ElevenLabs))
            .finish()
    }
}
