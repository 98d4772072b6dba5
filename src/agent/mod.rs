//! Agent module - vision-language model access and failover

pub mod llm;
pub mod failover;
pub mod prompt;

pub use failover::{
    Capability,
    EncodedImage,
    ModelCandidate,
    VisionOutcome,
    VisionQueryOrchestrator,
};
pub use llm::{ChatClient, ChatCompletion, ChatMessage, CompletionOptions, ProviderConfig};
