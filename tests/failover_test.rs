//! Vision failover chain against a scripted provider

mod common;

use arogya::agent::failover::{
    default_candidates, Capability, EncodedImage, ModelCandidate, VisionOutcome, VisionQueryOrchestrator,
    EXHAUSTED_APOLOGY, TEXT_ONLY_DISCLAIMER,
};
use arogya::config::Config;
use arogya::security::CredentialSet;
use common::{LogCapture, ScriptedChat};
use std::sync::Arc;
use std::time::Duration;

fn keyed() -> Arc<CredentialSet> {
    Arc::new(CredentialSet::new(Some("gsk_live_key".to_string()), None))
}

fn image() -> EncodedImage {
    EncodedImage::new("iVBORw0KGgo=", "image/png")
}

#[tokio::test]
async fn test_every_candidate_tried_once_in_order() {
    let table = vec![
        ModelCandidate::vision("v1"),
        ModelCandidate::vision("v2"),
        ModelCandidate::text_only("t1"),
    ];
    let chat = Arc::new(ScriptedChat::always_failing("LLM API error (503): overloaded", 3));
    let orch = VisionQueryOrchestrator::new(keyed(), chat.clone()).with_candidates(table);

    let outcome = orch.run("What is this rash?", &image(), "v1").await;

    assert_eq!(chat.models(), vec!["v1", "v2", "t1"]);
    assert_eq!(outcome.attempts(), 3);
    assert!(matches!(outcome, VisionOutcome::Exhausted { .. }));
    assert!(outcome.text().starts_with(EXHAUSTED_APOLOGY));
    assert!(outcome.text().contains("Technical details: LLM API error (503): overloaded"));
}

#[tokio::test]
async fn test_failover_to_second_model() {
    let chat = Arc::new(ScriptedChat::new(vec![
        Err("LLM API error (429): rate limit"),
        Ok("With what I see, I think you have mild eczema."),
    ]));
    let orch = VisionQueryOrchestrator::new(keyed(), chat.clone());

    let outcome = orch.run("q", &image(), "meta-llama/llama-4-scout-17b-16e-instruct").await;

    match outcome {
        VisionOutcome::Answered { model, capability, text, failures } => {
            assert_eq!(model, "llama-3.2-90b-vision-preview");
            assert_eq!(capability, Capability::Vision);
            assert_eq!(text, "With what I see, I think you have mild eczema.");
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected an answer, got {:?}", other),
    }
    assert_eq!(chat.calls().len(), 2);
}

#[tokio::test]
async fn test_text_only_candidate_gets_disclaimer_not_image() {
    let table = vec![ModelCandidate::vision("v"), ModelCandidate::text_only("t")];
    let chat = Arc::new(ScriptedChat::new(vec![Err("boom"), Ok("general advice")]));
    let orch = VisionQueryOrchestrator::new(keyed(), chat.clone()).with_candidates(table);

    let text = orch.analyze("Is there something wrong with my face?", &image(), "").await;
    assert_eq!(text, "general advice");

    let calls = chat.calls();
    assert!(calls[0].messages[0].has_image());
    assert!(!calls[1].messages[0].has_image());
    let sent = calls[1].messages[0].content_as_text().unwrap();
    assert!(sent.starts_with("Is there something wrong with my face?"));
    assert!(sent.ends_with(TEXT_ONLY_DISCLAIMER));
}

#[tokio::test]
async fn test_text_only_disabled_stops_at_vision_models() {
    let vision_count = default_candidates()
        .iter()
        .filter(|c| c.capability == Capability::Vision)
        .count();
    let chat = Arc::new(ScriptedChat::always_failing("down", vision_count));
    let orch = VisionQueryOrchestrator::new(keyed(), chat.clone()).allow_text_only(false);

    let outcome = orch.run("q", &image(), "").await;

    assert_eq!(chat.calls().len(), vision_count);
    assert!(matches!(outcome, VisionOutcome::Exhausted { .. }));
}

#[tokio::test]
async fn test_placeholder_key_short_circuits() {
    let creds = Arc::new(CredentialSet::new(Some("your_groq_api_key_here".to_string()), None));
    let chat = Arc::new(ScriptedChat::new(vec![Ok("should never be used")]));
    let orch = VisionQueryOrchestrator::new(creds, chat.clone());

    let outcome = orch.run("q", &image(), "").await;

    assert!(chat.calls().is_empty());
    assert!(matches!(outcome, VisionOutcome::NotConfigured { .. }));
    assert!(outcome.text().contains("GROQ_API_KEY"));
}

#[tokio::test]
async fn test_slow_model_times_out_and_advances() {
    use arogya::agent::llm::{ChatCompletion, ChatMessage, CompletionOptions};
    use async_trait::async_trait;

    struct SlowThenFast;

    #[async_trait]
    impl ChatCompletion for SlowThenFast {
        async fn complete(&self, model: &str, _m: Vec<ChatMessage>, _o: CompletionOptions) -> anyhow::Result<String> {
            if model == "slow" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(format!("answer from {}", model))
        }
    }

    let orch = VisionQueryOrchestrator::new(keyed(), Arc::new(SlowThenFast))
        .with_candidates(vec![ModelCandidate::vision("slow"), ModelCandidate::vision("fast")])
        .with_attempt_timeout(Duration::from_millis(50));

    let outcome = orch.run("q", &image(), "").await;
    assert_eq!(outcome.text(), "answer from fast");
    assert!(outcome.last_failure().unwrap().cause.contains("timed out"));
}

#[tokio::test]
async fn test_exhaustion_logs_last_cause() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let table = vec![ModelCandidate::vision("v1"), ModelCandidate::vision("v2")];
    let chat = Arc::new(ScriptedChat::new(vec![
        Err("LLM API error (429): rate limit"),
        Err("LLM API error (503): overloaded"),
    ]));
    let orch = VisionQueryOrchestrator::new(keyed(), chat).with_candidates(table);

    orch.run("q", &image(), "").await;

    let output = logs.contents();
    assert!(output.contains("Error with model v1: LLM API error (429): rate limit"));
    assert!(output.contains("All models failed. Last error: LLM API error (503): overloaded"));
}

#[test]
fn test_config_without_usable_chain_is_rejected() {
    let mut config = Config::default();
    config.models.candidates = vec![ModelCandidate::text_only("t")];
    config.models.allow_text_only_fallback = false;

    let result = VisionQueryOrchestrator::from_config(keyed(), Arc::new(ScriptedChat::new(vec![])), &config);
    assert!(result.is_err());
}
