/// Rule detectors. Each family subscribes to node kinds during the same
/// AST walk as the symbol collector and honors pragma suppression through
/// the aggregator.
pub mod danger;
pub mod logic;
pub mod perf;
pub mod quality;
pub mod secrets;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Ordered so that `Critical` compares greatest; the aggregator sorts
/// findings by descending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Severity {
    /// Lenient parse for severities arriving from external engines.
    pub fn parse(value: &str) -> Severity {
        match value.to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            "INFO" => Severity::Info,
            _ => Severity::Warn,
        }
    }
}

/// A rule violation or a dead-code verdict, in the shape the JSON report
/// emits.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub confidence: u8,
    pub message: String,
    pub file: PathBuf,
    pub line: usize,
    pub col: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl Finding {
    pub fn new(
        rule_id: &str,
        severity: Severity,
        message: impl Into<String>,
        file: PathBuf,
        line: usize,
        col: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            confidence: 100,
            message: message.into(),
            file,
            line,
            col,
            symbol: None,
        }
    }
}
