//! Health reports for the check command

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Severity {
    /// Informational, no action needed
    Info,
    /// Degrades the service; a fallback covers it
    Warning,
    /// Consultations cannot work as intended
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    pub category: CheckCategory,
    pub severity: Severity,
    pub passed: bool,
    /// Human-readable message
    pub message: String,
    /// Optional fix suggestion
    pub fix: Option<String>,
}

impl CheckResult {
    /// Create a passing check
    pub fn pass(name: impl Into<String>, category: CheckCategory, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            severity: Severity::Info,
            passed: true,
            message: message.into(),
            fix: None,
        }
    }

    /// Create a failing check
    pub fn fail(
        name: impl Into<String>,
        category: CheckCategory,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            severity,
            passed: false,
            message: message.into(),
            fix: None,
        }
    }

    /// Add a fix suggestion
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Category of check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckCategory {
    Configuration,
    Authentication,
    System,
    FileSystem,
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckCategory::Configuration => write!(f, "Configuration"),
            CheckCategory::Authentication => write!(f, "Authentication"),
            CheckCategory::System => write!(f, "System"),
            CheckCategory::FileSystem => write!(f, "FileSystem"),
        }
    }
}

/// Complete health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// When the report was generated
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub checks: Vec<CheckResult>,
    /// False once any check fails at `Error` severity
    pub healthy: bool,
    pub summary: String,
}

impl HealthReport {
    /// Create a new empty report
    pub fn new(version: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            version: version.to_string(),
            checks: Vec::new(),
            healthy: true,
            summary: String::new(),
        }
    }

    /// Add a check result
    pub fn add_check(&mut self, check: CheckResult) {
        if !check.passed && check.severity >= Severity::Error {
            self.healthy = false;
        }
        self.checks.push(check);
    }

    /// Finalize the report and generate summary
    pub fn finalize(&mut self) {
        let errors = self.count_by_severity(Severity::Error);
        let warnings = self.count_by_severity(Severity::Warning);

        self.summary = match (errors, warnings) {
            (0, 0) => "All checks passed".to_string(),
            (0, w) => format!("Ready with {} warning(s)", w),
            (e, 0) => format!("{} check(s) failed", e),
            (e, w) => format!("{} check(s) failed, {} warning(s)", e, w),
        };
    }

    /// Count failed checks by severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.severity == severity)
            .count()
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "AROGYA HEALTH REPORT")?;
        writeln!(f, "Generated: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f)?;

        let mut categories: Vec<CheckCategory> = self.checks.iter().map(|c| c.category).collect();
        categories.sort();
        categories.dedup();

        for category in categories {
            writeln!(f, "┌─ {} ", category)?;
            for check in self.checks.iter().filter(|c| c.category == category) {
                let status = if check.passed { "✓" } else { "✗" };
                writeln!(f, "│ {} {} [{}] {}", status, check.severity, check.name, check.message)?;
                if !check.passed {
                    if let Some(ref fix) = check.fix {
                        writeln!(f, "│    Fix: {}", fix)?;
                    }
                }
            }
            writeln!(f, "└─")?;
            writeln!(f)?;
        }

        writeln!(f, "{}", self.summary)
    }
}
