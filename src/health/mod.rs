//! Health module - readiness checks
//!
//! Verifies what a consultation depends on:
//! - Configuration file parses
//! - Provider credentials (Groq required, ElevenLabs optional)
//! - `ffmpeg` availability for the subprocess converter
//! - Upload directory is writable

pub mod checks;
pub mod report;

use anyhow::Result;
use tracing::warn;

use crate::config::{config_path, Config};
use crate::security::CredentialSet;
use report::HealthReport;

pub use report::{CheckCategory, CheckResult, Severity};

/// Run every check against the current environment and print the report
pub fn run_health_check() -> Result<HealthReport> {
    println!("\nArogya - readiness check");
    println!("═══════════════════════════════════════════════════════════\n");

    let config_file = config_path()?;
    // A broken file is reported as a failed check rather than aborting
    let config = match std::fs::read_to_string(&config_file) {
        Ok(contents) => Config::from_toml(&contents).unwrap_or_else(|e| {
            warn!("Falling back to default configuration: {:#}", e);
            Config::default()
        }),
        Err(_) => Config::default(),
    };
    let credentials = CredentialSet::from_env();

    let report = build_report(&config_file, &config, &credentials);
    println!("{}", report);
    Ok(report)
}

/// Collect check results into a finalized report
pub fn build_report(config_file: &std::path::Path, config: &Config, credentials: &CredentialSet) -> HealthReport {
    let mut report = HealthReport::new(crate::VERSION);
    for result in checks::run_all_checks(config_file, config, credentials) {
        report.add_check(result);
    }
    report.finalize();
    report
}
