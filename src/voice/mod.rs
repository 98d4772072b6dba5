//! Voice Module
//!
//! - Whisper transcription of the patient's recording
//! - Remote TTS providers (ElevenLabs, Google)
//! - Speech synthesis with provider fallback
//! - MP3 → WAV normalization
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use arogya::config::Config;
//! use arogya::security::CredentialSet;
//! use arogya::voice::SpeechSynthesisOrchestrator;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::default();
//! let credentials = Arc::new(CredentialSet::from_env());
//! let speech = SpeechSynthesisOrchestrator::from_config(credentials, &config)?;
//!
//! match speech.synthesize("Keep the area moisturized.", Path::new("uploads/reply.wav")).await {
//!     Some(path) => println!("audio at {}", path.display()),
//!     None => println!("no audio available"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod synthesis;
pub mod tts;
pub mod whisper;

pub use audio::{AudioConverter, AudioNormalizer, FfmpegConverter, SymphoniaConverter};
pub use synthesis::{SpeechArtifact, SpeechSource, SpeechSynthesisOrchestrator, APOLOGY_UTTERANCE};
pub use tts::{ElevenLabsTts, GoogleTts, SpeechProvider};
pub use whisper::{GroqWhisper, Transcriber};
