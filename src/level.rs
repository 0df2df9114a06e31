use serde::{Deserialize, Serialize};

/// Severity of a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Review priority attached to security findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningSeverity {
    Low,
    Medium,
    High,
}

impl SigningSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningSeverity::Low => "low",
            SigningSeverity::Medium => "medium",
            SigningSeverity::High => "high",
        }
    }
}

/// Level a finding is remapped to by configuration. `Allow` drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Allow,
    Notice,
    Warning,
    Error,
}

impl LintLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintLevel::Allow => "allow",
            LintLevel::Notice => "notice",
            LintLevel::Warning => "warning",
            LintLevel::Error => "error",
        }
    }

    /// Severity the finding is reported at, or `None` when it is dropped.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            LintLevel::Allow => None,
            LintLevel::Notice => Some(Severity::Notice),
            LintLevel::Warning => Some(Severity::Warning),
            LintLevel::Error => Some(Severity::Error),
        }
    }
}
