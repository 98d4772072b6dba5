//! Arogya - Voice and Image Consultation Library
//!
//! A patient records a question and uploads a photo; the library:
//! - Transcribes the recording with Whisper (Groq)
//! - Asks a ranked chain of vision models for an assessment
//! - Voices the answer with ElevenLabs, falling back to Google TTS
//! - Normalizes the audio to WAV for playback
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use arogya::{Config, Consultation, CredentialSet};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let consultation = Consultation::from_config(Arc::new(CredentialSet::from_env()), &config)?;
//!     let result = consultation.diagnose(Path::new("question.wav"), Path::new("rash.jpg")).await?;
//!     println!("{}", result.diagnosis);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod security;
pub mod agent;
pub mod voice;
pub mod consultation;
pub mod server;
pub mod health;
pub mod cli;

pub use agent::{
    failover::VisionQueryOrchestrator,
    llm::ChatClient,
};

pub use config::Config;

pub use consultation::{Consultation, ConsultationError, Diagnosis};

pub use security::{CredentialSet, Provider};

pub use voice::{
    audio::AudioNormalizer,
    synthesis::SpeechSynthesisOrchestrator,
};

pub use server::{
    ServerState,
    start as start_server,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest prefix of `s` with at most `max_chars` characters
pub fn truncate_safe(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
