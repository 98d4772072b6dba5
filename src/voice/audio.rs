//! Audio format normalization
//!
//! Providers hand back MP3; browsers play WAV most reliably. Conversion is a
//! best-effort chain:
//!
//! ```text
//! SymphoniaConverter (in-process) → FfmpegConverter (subprocess) → keep the MP3
//! ```
//!
//! [`AudioNormalizer::normalize`] never fails; the returned path always names
//! the format that was actually produced.

use anyhow::{Result, Context, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Compressed intermediate extension
pub const COMPRESSED_EXT: &str = "mp3";

/// Playback extension
pub const PLAYBACK_EXT: &str = "wav";

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Where the provider's MP3 goes for a requested output path
///
/// `a.mp3` stays as is; anything else gets `.mp3` appended.
pub fn compressed_path(output: &Path) -> PathBuf {
    if has_extension(output, COMPRESSED_EXT) {
        output.to_path_buf()
    } else {
        let mut name = output.as_os_str().to_owned();
        name.push(".");
        name.push(COMPRESSED_EXT);
        PathBuf::from(name)
    }
}

/// Where the converted WAV goes for a requested output path
///
/// `a.wav` stays as is; anything else has its extension replaced.
pub fn playback_path(output: &Path) -> PathBuf {
    if has_extension(output, PLAYBACK_EXT) {
        output.to_path_buf()
    } else {
        output.with_extension(PLAYBACK_EXT)
    }
}

/// Converts a compressed file into an uncompressed one
#[async_trait]
pub trait AudioConverter: Send + Sync {
    fn name(&self) -> &str;

    async fn convert(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// In-process MP3 → 16-bit PCM WAV using symphonia + hound
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaConverter;

#[async_trait]
impl AudioConverter for SymphoniaConverter {
    fn name(&self) -> &str {
        "symphonia"
    }

    async fn convert(&self, src: &Path, dst: &Path) -> Result<()> {
        let src = src.to_path_buf();
        let dst = dst.to_path_buf();
        tokio::task::spawn_blocking(move || decode_to_wav(&src, &dst))
            .await
            .context("Conversion task panicked")?
    }
}

fn decode_to_wav(src: &Path, dst: &Path) -> Result<()> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error as SymphoniaError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(src)
        .with_context(|| format!("Failed to open {}", src.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = src.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Unrecognized audio container")?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .context("No audio track found")?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported audio codec")?;

    let mut writer: Option<hound::WavWriter<std::io::BufWriter<std::fs::File>>> = None;
    let mut frames_written: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(anyhow::anyhow!("Failed to read packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to decode audio: {}", e)),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        if writer.is_none() {
            let wav_spec = hound::WavSpec {
                channels: spec.channels.count() as u16,
                sample_rate: spec.rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            writer = Some(hound::WavWriter::create(dst, wav_spec)
                .context("Failed to create WAV file")?);
        }

        let mut sample_buf = SampleBuffer::<i16>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        if let Some(w) = writer.as_mut() {
            for &sample in sample_buf.samples() {
                w.write_sample(sample)?;
            }
        }
        frames_written += num_frames as u64;
    }

    match writer {
        Some(w) if frames_written > 0 => {
            w.finalize().context("Failed to finalize WAV file")?;
            Ok(())
        }
        _ => bail!("No audio samples decoded from {}", src.display()),
    }
}

/// External `ffmpeg` subprocess
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: String,
    timeout: Duration,
}

impl FfmpegConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg", Duration::from_secs(30))
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(&self, src: &Path, dst: &Path) -> Result<()> {
        let child = tokio::process::Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(src)
            .arg(dst)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow::anyhow!("{} timed out after {}s", self.program, self.timeout.as_secs()))?
            .context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            bail!(
                "ffmpeg returned non-zero exit code: {} ({})",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Ordered converter chain with passthrough as the last resort
#[derive(Clone)]
pub struct AudioNormalizer {
    converters: Vec<Arc<dyn AudioConverter>>,
}

impl AudioNormalizer {
    /// symphonia, then ffmpeg
    pub fn new(ffmpeg_path: impl Into<String>, conversion_timeout: Duration) -> Self {
        Self::with_converters(vec![
            Arc::new(SymphoniaConverter),
            Arc::new(FfmpegConverter::new(ffmpeg_path, conversion_timeout)),
        ])
    }

    pub fn with_converters(converters: Vec<Arc<dyn AudioConverter>>) -> Self {
        Self { converters }
    }

    /// Build from loaded configuration
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.voice.ffmpeg_path.clone(), config.timeouts.conversion())
    }

    /// Convert `compressed` into `target`, or hand back `compressed` untouched
    pub async fn normalize(&self, compressed: &Path, target: &Path) -> PathBuf {
        if compressed == target {
            return compressed.to_path_buf();
        }

        for converter in &self.converters {
            match converter.convert(compressed, target).await {
                Ok(()) if is_non_empty_file(target).await => {
                    info!("Converted {} to {} using {}", compressed.display(), target.display(), converter.name());
                    return target.to_path_buf();
                }
                Ok(()) => {
                    warn!("{} reported success but produced no output", converter.name());
                }
                Err(e) => {
                    warn!("{} conversion failed: {:#}", converter.name(), e);
                }
            }
            // Leave no half-written file behind for the next converter
            let _ = tokio::fs::remove_file(target).await;
        }

        info!("Using original compressed file: {}", compressed.display());
        compressed.to_path_buf()
    }
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new("ffmpeg", Duration::from_secs(30))
    }
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
