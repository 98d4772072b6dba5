//! Hand-written fakes shared by the integration tests

#![allow(dead_code)]

use anyhow::{bail, Result};
use arogya::agent::llm::{ChatCompletion, ChatMessage, CompletionOptions};
use arogya::voice::audio::AudioConverter;
use arogya::voice::tts::SpeechProvider;
use arogya::voice::whisper::Transcriber;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Minimal PNG header; enough for format sniffing
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x02\0\0\0";

/// One recorded chat call
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Replays scripted replies in order and records every call
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<ChatCall>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error`
    pub fn always_failing(error: &str, times: usize) -> Self {
        Self::new(vec![Err(error); times])
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedChat {
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(ChatCall { model: model.to_string(), messages });
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => bail!("{}", e),
            None => bail!("no scripted reply for {}", model),
        }
    }
}

/// Returns a fixed transcript
pub struct FixedTranscriber(pub String);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Always fails to transcribe
pub struct BrokenTranscriber;

#[async_trait]
impl Transcriber for BrokenTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
        bail!("Transcription API error (401 Unauthorized): invalid key")
    }
}

/// Speech provider that fails its first `fail_first` calls
pub struct FakeSpeech {
    name: &'static str,
    fail_first: usize,
    texts: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn new(name: &'static str, fail_first: usize) -> Self {
        Self { name, fail_first, texts: Mutex::new(Vec::new()) }
    }

    pub fn working(name: &'static str) -> Self {
        Self::new(name, 0)
    }

    pub fn broken(name: &'static str) -> Self {
        Self::new(name, usize::MAX)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.texts.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeech {
    fn name(&self) -> &str {
        self.name
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let count = {
            let mut texts = self.texts.lock().unwrap();
            texts.push(text.to_string());
            texts.len()
        };
        if count <= self.fail_first {
            bail!("{} service unavailable", self.name);
        }
        Ok(b"ID3\x04\0\0\0\0\0\0fake-mp3-frames".to_vec())
    }
}

/// Writes one second of silence as 16-bit mono WAV
pub struct SilentWavConverter;

#[async_trait]
impl AudioConverter for SilentWavConverter {
    fn name(&self) -> &str {
        "silent-wav"
    }

    async fn convert(&self, _src: &Path, dst: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dst, spec)?;
        for _ in 0..16000 {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Always fails
pub struct FailingConverter(pub &'static str);

#[async_trait]
impl AudioConverter for FailingConverter {
    fn name(&self) -> &str {
        self.0
    }

    async fn convert(&self, _src: &Path, _dst: &Path) -> Result<()> {
        bail!("{} is not available", self.0)
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route events on this thread here until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
