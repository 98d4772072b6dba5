//! Health checks for the check command

use std::path::Path;
use std::process::{Command, Stdio};

use super::report::{CheckCategory, CheckResult, Severity};
use crate::config::Config;
use crate::security::{CredentialSet, Provider};

/// Run all health checks
pub fn run_all_checks(config_file: &Path, config: &Config, credentials: &CredentialSet) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(check_config_file(config_file));
    results.extend(check_credentials(credentials));
    results.push(check_ffmpeg(&config.voice.ffmpeg_path));
    results.push(check_upload_dir(&config.server.upload_dir));

    results
}

/// Config file absent (defaults apply) or valid
pub fn check_config_file(path: &Path) -> CheckResult {
    if !path.exists() {
        return CheckResult::pass(
            "config_file",
            CheckCategory::Configuration,
            format!("No config file at {}; defaults in use", path.display()),
        );
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match Config::from_toml(&contents).and_then(|c| c.models.candidate_table()) {
            Ok(_) => CheckResult::pass(
                "config_file",
                CheckCategory::Configuration,
                "Configuration file is valid",
            ),
            Err(e) => CheckResult::fail(
                "config_file",
                CheckCategory::Configuration,
                Severity::Error,
                format!("Configuration file is invalid: {:#}", e),
            )
            .with_fix("Run 'arogya config --reset' to restore defaults"),
        },
        Err(e) => CheckResult::fail(
            "config_file",
            CheckCategory::Configuration,
            Severity::Error,
            format!("Cannot read configuration file: {}", e),
        )
        .with_fix("Check file permissions"),
    }
}

/// Groq is required; ElevenLabs has a free fallback
pub fn check_credentials(credentials: &CredentialSet) -> Vec<CheckResult> {
    [(Provider::Groq, Severity::Error), (Provider::ElevenLabs, Severity::Warning)]
        .into_iter()
        .map(|(provider, severity)| {
            let name = provider.env_var().to_lowercase();
            if credentials.is_configured(provider) {
                return CheckResult::pass(
                    name,
                    CheckCategory::Authentication,
                    format!("{} is set", provider.env_var()),
                );
            }

            let state = if credentials.is_placeholder(provider) {
                "still the placeholder value"
            } else {
                "not set"
            };
            let impact = match provider {
                Provider::Groq => "transcription and image analysis will not work",
                Provider::ElevenLabs => "answers will be voiced with Google Text-to-Speech",
            };
            CheckResult::fail(
                name,
                CheckCategory::Authentication,
                severity,
                format!("{} is {}; {}", provider.env_var(), state, impact),
            )
            .with_fix(format!(
                "Add {}=<key> to .env (get one at {})",
                provider.env_var(),
                provider.signup_url()
            ))
        })
        .collect()
}

/// The subprocess converter is optional; the built-in decoder covers MP3
pub fn check_ffmpeg(program: &str) -> CheckResult {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            let version = stdout.lines().next().unwrap_or("ffmpeg").trim().to_string();
            CheckResult::pass("ffmpeg", CheckCategory::System, format!("Found: {}", version))
        }
        _ => CheckResult::fail(
            "ffmpeg",
            CheckCategory::System,
            Severity::Warning,
            format!("'{}' not found; relying on the built-in MP3 decoder", program),
        )
        .with_fix("Install ffmpeg or set voice.ffmpeg_path"),
    }
}

/// Uploads and generated audio must be writable
pub fn check_upload_dir(dir: &Path) -> CheckResult {
    if let Err(e) = std::fs::create_dir_all(dir) {
        return CheckResult::fail(
            "upload_directory",
            CheckCategory::FileSystem,
            Severity::Error,
            format!("Cannot create {}: {}", dir.display(), e),
        )
        .with_fix("Check directory permissions or set server.upload_dir");
    }

    let test_file = dir.join(".write_test");
    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            std::fs::remove_file(&test_file).ok();
            CheckResult::pass(
                "upload_directory",
                CheckCategory::FileSystem,
                format!("{} is writable", dir.display()),
            )
        }
        Err(e) => CheckResult::fail(
            "upload_directory",
            CheckCategory::FileSystem,
            Severity::Error,
            format!("Cannot write to {}: {}", dir.display(), e),
        )
        .with_fix("Check directory permissions"),
    }
}
