//! Speech synthesis fallback and audio normalization

mod common;

use arogya::security::CredentialSet;
use arogya::voice::audio::{AudioConverter, AudioNormalizer};
use arogya::voice::synthesis::{SpeechSource, SpeechSynthesisOrchestrator, APOLOGY_UTTERANCE};
use arogya::voice::tts::SpeechProvider;
use common::{FailingConverter, FakeSpeech, SilentWavConverter};
use std::sync::Arc;

fn keyed() -> Arc<CredentialSet> {
    Arc::new(CredentialSet::new(None, Some("sk_eleven_live".to_string())))
}

fn wav_normalizer() -> AudioNormalizer {
    AudioNormalizer::with_converters(vec![Arc::new(SilentWavConverter)])
}

fn orchestrator(
    credentials: Arc<CredentialSet>,
    primary: &Arc<FakeSpeech>,
    baseline: &Arc<FakeSpeech>,
    normalizer: AudioNormalizer,
) -> SpeechSynthesisOrchestrator {
    let primary: Arc<dyn SpeechProvider> = primary.clone();
    let baseline: Arc<dyn SpeechProvider> = baseline.clone();
    SpeechSynthesisOrchestrator::new(credentials, Some(primary), baseline, normalizer)
}

#[tokio::test]
async fn test_primary_success_yields_wav_and_skips_baseline() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let primary = Arc::new(FakeSpeech::working("ElevenLabs"));
    let baseline = Arc::new(FakeSpeech::working("Google TTS"));
    let orch = orchestrator(keyed(), &primary, &baseline, wav_normalizer());

    let artifact = orch
        .run("Keep the area moisturized.", &dir.path().join("reply.wav"))
        .await
        .expect("audio");

    assert_eq!(artifact.source, SpeechSource::Primary);
    assert_eq!(artifact.path, dir.path().join("reply.wav"));
    assert_eq!(artifact.path.extension().unwrap(), "wav");
    assert!(hound::WavReader::open(&artifact.path).is_ok());
    assert_eq!(primary.texts(), vec!["Keep the area moisturized."]);
    assert_eq!(baseline.call_count(), 0);
    // Intermediate is cleaned up once converted
    assert!(!dir.path().join("reply.wav.mp3").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_primary_key_uses_baseline_with_disclaimer() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(FakeSpeech::working("ElevenLabs"));
    let baseline = Arc::new(FakeSpeech::working("Google TTS"));
    let orch = orchestrator(Arc::new(CredentialSet::empty()), &primary, &baseline, wav_normalizer());

    let path = orch.synthesize("Apply a mild cream.", &dir.path().join("reply.wav")).await;

    assert!(path.is_some());
    assert_eq!(primary.call_count(), 0);
    let spoken = baseline.texts();
    assert_eq!(spoken.len(), 1);
    assert_ne!(spoken[0], "Apply a mild cream.");
    assert!(spoken[0].starts_with("Apply a mild cream."));
    assert!(spoken[0].contains("Note: Using Google Text-to-Speech"));
}

#[tokio::test]
async fn test_primary_failure_falls_back_once() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(FakeSpeech::broken("ElevenLabs"));
    let baseline = Arc::new(FakeSpeech::working("Google TTS"));
    let orch = orchestrator(keyed(), &primary, &baseline, wav_normalizer());

    let artifact = orch.run("hello", &dir.path().join("reply.wav")).await.unwrap();

    assert_eq!(primary.call_count(), 1);
    assert_eq!(baseline.call_count(), 1);
    assert_eq!(artifact.source, SpeechSource::Baseline);
    assert!(baseline.texts()[0].contains("ElevenLabs service unavailable"));
}

#[tokio::test]
async fn test_total_failure_returns_none_after_one_apology() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(FakeSpeech::broken("ElevenLabs"));
    let baseline = Arc::new(FakeSpeech::broken("Google TTS"));
    let orch = orchestrator(keyed(), &primary, &baseline, wav_normalizer());

    let result = orch.synthesize("hello", &dir.path().join("reply.wav")).await;

    assert!(result.is_none());
    assert_eq!(primary.call_count(), 1);
    let spoken = baseline.texts();
    assert_eq!(spoken.len(), 2);
    assert_eq!(spoken.iter().filter(|t| t.as_str() == APOLOGY_UTTERANCE).count(), 1);
    assert_eq!(spoken[1], APOLOGY_UTTERANCE);
}

#[tokio::test]
async fn test_conversion_failure_passes_mp3_through() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(FakeSpeech::working("ElevenLabs"));
    let baseline = Arc::new(FakeSpeech::working("Google TTS"));
    let normalizer = AudioNormalizer::with_converters(vec![
        Arc::new(FailingConverter("library")) as Arc<dyn AudioConverter>,
        Arc::new(FailingConverter("subprocess")),
    ]);
    let orch = orchestrator(keyed(), &primary, &baseline, normalizer);

    let path = orch.synthesize("hello", &dir.path().join("reply")).await.unwrap();

    assert_eq!(path, dir.path().join("reply.mp3"));
    assert!(path.exists());
    assert!(!dir.path().join("reply.wav").exists());
}

#[tokio::test]
async fn test_second_converter_used_when_first_fails() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("speech.mp3");
    std::fs::write(&src, b"ID3").unwrap();
    let target = dir.path().join("speech.wav");

    let normalizer = AudioNormalizer::with_converters(vec![
        Arc::new(FailingConverter("library")) as Arc<dyn AudioConverter>,
        Arc::new(SilentWavConverter),
    ]);

    assert_eq!(normalizer.normalize(&src, &target).await, target);
    let reader = hound::WavReader::open(&target).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
}
