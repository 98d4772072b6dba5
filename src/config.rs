//! Configuration management
//!
//! Non-secret settings (models, voice, server, timeouts) live in a TOML file.
//! API keys are never stored here; see [`crate::security::CredentialSet`].

use anyhow::{Result, Context, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::failover::{Capability, ModelCandidate};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Vision and transcription model settings
    #[serde(default)]
    pub models: ModelsConfig,
    /// Speech synthesis settings
    #[serde(default)]
    pub voice: VoiceConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote call and conversion timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Model assignments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Vision model tried first
    #[serde(default = "default_vision_model")]
    pub vision: String,
    /// Speech-to-text model
    #[serde(default = "default_transcription_model")]
    pub transcription: String,
    /// Accept answers from text-only models when every vision model failed
    #[serde(default = "default_true")]
    pub allow_text_only_fallback: bool,
    /// Completion length limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Explicit fallback table; empty means the built-in table
    #[serde(default)]
    pub candidates: Vec<ModelCandidate>,
}

fn default_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    800
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            vision: default_vision_model(),
            transcription: default_transcription_model(),
            allow_text_only_fallback: true,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            candidates: Vec::new(),
        }
    }
}

impl ModelsConfig {
    /// The configured candidate table, or the built-in one
    ///
    /// Fails when the table would leave the fallback chain empty.
    pub fn candidate_table(&self) -> Result<Vec<ModelCandidate>> {
        let table = if self.candidates.is_empty() {
            crate::agent::failover::default_candidates()
        } else {
            self.candidates.clone()
        };

        let has_vision = table.iter().any(|c| c.capability == Capability::Vision);
        if !has_vision && !self.allow_text_only_fallback {
            bail!("models.candidates has no vision model and allow_text_only_fallback is false");
        }
        Ok(table)
    }
}

/// Speech synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// ElevenLabs voice id
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    /// ElevenLabs model id
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    /// ElevenLabs output format identifier
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Language code for the baseline provider and transcription hint
    #[serde(default = "default_language")]
    pub language: String,
    /// External converter binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

// "Aria"
fn default_voice_id() -> String {
    "9BWtsMINqrJLrRacOk9x".to_string()
}

fn default_tts_model() -> String {
    "eleven_turbo_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_22050_32".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            tts_model: default_tts_model(),
            output_format: default_output_format(),
            language: default_language(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where uploads and generated audio are written
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Request body limit in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_mb() -> usize {
    25
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per remote call (each vision candidate, each TTS provider, transcription)
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
    /// Per external conversion subprocess
    #[serde(default = "default_conversion_secs")]
    pub conversion_secs: u64,
}

fn default_request_secs() -> u64 {
    60
}

fn default_conversion_secs() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
            conversion_secs: default_conversion_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn conversion(&self) -> Duration {
        Duration::from_secs(self.conversion_secs)
    }
}

impl Config {
    /// Load configuration from file, writing defaults if none exists
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            Self::from_toml(&contents)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path()?;
        let parent = config_path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "arogya", "arogya")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    println!();
    println!("  vision model:        {}", config.models.vision);
    println!("  transcription model: {}", config.models.transcription);
    println!("  text-only fallback:  {}", if config.models.allow_text_only_fallback { "allowed" } else { "disabled" });
    println!("  voice:               {} ({}, {})", config.voice.voice_id, config.voice.tts_model, config.voice.output_format);
    println!("  language:            {}", config.voice.language);
    println!("  upload dir:          {}", config.server.upload_dir.display());
    println!("  request timeout:     {}s", config.timeouts.request_secs);
    println!();
    println!("Fallback chain:");
    for (i, candidate) in config.models.candidate_table()?.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, candidate.id, candidate.capability);
    }

    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults.");
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
