//! Speech synthesis with provider fallback
//!
//! Per call:
//!
//! ```text
//! primary (if keyed) ──fail──▶ baseline + note ──fail──▶ baseline(apology) ──fail──▶ None
//!        │                          │                           │
//!        └──────────────ok──────────┴─────────────ok────────────┴──▶ write MP3 → normalize
//! ```
//!
//! Each provider is tried at most once. Normalization never fails the call.

use anyhow::{Result, Context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::security::{CredentialSet, Provider};
use crate::voice::audio::{compressed_path, playback_path, AudioNormalizer};
use crate::voice::tts::{ElevenLabsTts, GoogleTts, SpeechProvider};

/// Spoken when the baseline provider cannot voice the real answer
pub const APOLOGY_UTTERANCE: &str = "Sorry, there was an error generating the audio response.";

/// Appended to the spoken text when the primary provider has no key
pub fn missing_key_note() -> String {
    format!(
        "Note: Using Google Text-to-Speech because ElevenLabs API key is not set. Please add your actual ElevenLabs API key to the .env file. You can get an API key from {}",
        Provider::ElevenLabs.signup_url()
    )
}

/// Appended to the spoken text when the primary provider failed
pub fn provider_error_note(cause: &str) -> String {
    format!("Note: Using Google Text-to-Speech because ElevenLabs API returned an error: {}", cause)
}

/// Which rung of the chain produced the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechSource {
    Primary,
    Baseline,
    Apology,
}

impl std::fmt::Display for SpeechSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechSource::Primary => write!(f, "primary"),
            SpeechSource::Baseline => write!(f, "baseline"),
            SpeechSource::Apology => write!(f, "apology"),
        }
    }
}

/// Audio that was produced, and by whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechArtifact {
    pub path: PathBuf,
    pub source: SpeechSource,
}

pub struct SpeechSynthesisOrchestrator {
    credentials: Arc<CredentialSet>,
    primary: Option<Arc<dyn SpeechProvider>>,
    baseline: Arc<dyn SpeechProvider>,
    normalizer: AudioNormalizer,
    attempt_timeout: Duration,
}

impl SpeechSynthesisOrchestrator {
    pub fn new(
        credentials: Arc<CredentialSet>,
        primary: Option<Arc<dyn SpeechProvider>>,
        baseline: Arc<dyn SpeechProvider>,
        normalizer: AudioNormalizer,
    ) -> Self {
        Self {
            credentials,
            primary,
            baseline,
            normalizer,
            attempt_timeout: Duration::from_secs(60),
        }
    }

    /// Bound each provider call
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// ElevenLabs primary, Google baseline, configured converters
    pub fn from_config(credentials: Arc<CredentialSet>, config: &crate::config::Config) -> Result<Self> {
        let primary: Arc<dyn SpeechProvider> =
            Arc::new(ElevenLabsTts::from_config(credentials.clone(), config)?);
        let baseline: Arc<dyn SpeechProvider> = Arc::new(GoogleTts::from_config(config)?);
        Ok(Self::new(credentials, Some(primary), baseline, AudioNormalizer::from_config(config))
            .with_attempt_timeout(config.timeouts.request()))
    }

    /// Voice `text` near `output_path`; `None` means no audio is available
    pub async fn synthesize(&self, text: &str, output_path: &Path) -> Option<PathBuf> {
        self.run(text, output_path).await.map(|artifact| artifact.path)
    }

    /// Same as [`synthesize`](Self::synthesize) but reports which provider answered
    pub async fn run(&self, text: &str, output_path: &Path) -> Option<SpeechArtifact> {
        let compressed = compressed_path(output_path);

        let spoken = match self.primary.as_ref() {
            Some(primary) if self.credentials.is_configured(Provider::ElevenLabs) => {
                match self.produce(primary.as_ref(), text, &compressed).await {
                    Ok(()) => {
                        return Some(self.finish(&compressed, output_path, SpeechSource::Primary).await);
                    }
                    Err(e) => {
                        let cause = format!("{:#}", e);
                        warn!("{} failed: {}; falling back to {}", primary.name(), cause, self.baseline.name());
                        format!("{}\n\n{}", text, provider_error_note(&cause))
                    }
                }
            }
            Some(_) => {
                warn!(
                    "{} is not set or is a placeholder; falling back to {}",
                    Provider::ElevenLabs.env_var(),
                    self.baseline.name()
                );
                format!("{}\n\n{}", text, missing_key_note())
            }
            None => {
                info!("No primary speech provider; using {}", self.baseline.name());
                text.to_string()
            }
        };

        match self.produce(self.baseline.as_ref(), &spoken, &compressed).await {
            Ok(()) => return Some(self.finish(&compressed, output_path, SpeechSource::Baseline).await),
            Err(e) => error!("Error generating audio with {}: {:#}", self.baseline.name(), e),
        }

        match self.produce(self.baseline.as_ref(), APOLOGY_UTTERANCE, &compressed).await {
            Ok(()) => Some(self.finish(&compressed, output_path, SpeechSource::Apology).await),
            Err(e) => {
                error!("Failed to generate apology audio: {:#}", e);
                None
            }
        }
    }

    /// One provider call plus writing its MP3
    async fn produce(&self, provider: &dyn SpeechProvider, text: &str, compressed: &Path) -> Result<()> {
        let audio = tokio::time::timeout(self.attempt_timeout, provider.synthesize(text))
            .await
            .map_err(|_| anyhow::anyhow!("{} timed out after {}s", provider.name(), self.attempt_timeout.as_secs()))??;

        if let Some(parent) = compressed.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(compressed, &audio)
            .await
            .with_context(|| format!("Failed to write {}", compressed.display()))?;

        info!("Generated MP3 file with {} at: {}", provider.name(), compressed.display());
        Ok(())
    }

    async fn finish(&self, compressed: &Path, output_path: &Path, source: SpeechSource) -> SpeechArtifact {
        let target = playback_path(output_path);
        let path = self.normalizer.normalize(compressed, &target).await;
        if path != compressed {
            // The intermediate is no longer needed once converted
            if let Err(e) = tokio::fs::remove_file(compressed).await {
                warn!("Could not remove {}: {}", compressed.display(), e);
            }
        }
        info!(source = %source, "Audio response ready at {}", path.display());
        SpeechArtifact { path, source }
    }
}
