use crate::level::{Severity, SigningSeverity};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier tuple of a finding: `(namespace, function, reason)`.
///
/// Tests and suppression tooling match on this, never on the message text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ErrorId {
    pub namespace: Cow<'static, str>,
    pub function: Cow<'static, str>,
    pub reason: Cow<'static, str>,
}

impl ErrorId {
    pub fn new(
        namespace: impl Into<Cow<'static, str>>,
        function: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            function: function.into(),
            reason: reason.into(),
        }
    }

    /// Identifier in the `javascript` namespace used by every engine finding.
    pub fn js(
        function: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new("javascript", function, reason)
    }

    /// True when `self` equals the tuple, for terse assertions.
    pub fn is(&self, namespace: &str, function: &str, reason: &str) -> bool {
        self.namespace == namespace && self.function == function && self.reason == reason
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.function, self.reason)
    }
}

/// Line/column of a node as reported by the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Compatibility classification for version-gated findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatInfo {
    pub compatibility_type: Severity,
    /// Application GUID -> affected targeted versions.
    pub for_appversions: BTreeMap<String, Vec<String>>,
}

/// A single finding produced by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct Diagnostic {
    pub id: ErrorId,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
    pub file: Option<String>,
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<CompatInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_severity: Option<SigningSeverity>,
}

/// Builder handed to [`crate::bundle::ErrorBundle`] report methods.
#[derive(Debug, Clone)]
pub struct Report {
    pub(crate) id: ErrorId,
    pub(crate) message: String,
    pub(crate) description: Vec<String>,
    pub(crate) file: Option<String>,
    pub(crate) position: Option<Position>,
    pub(crate) compatibility: Option<CompatInfo>,
    pub(crate) signing_severity: Option<SigningSeverity>,
}

impl Report {
    pub fn new(id: ErrorId, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
            description: Vec::new(),
            file: None,
            position: None,
            compatibility: None,
            signing_severity: None,
        }
    }

    #[must_use]
    pub fn description<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.description.extend(lines.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn at(mut self, file: Option<String>, position: Option<Position>) -> Self {
        self.file = file;
        self.position = position;
        self
    }

    #[must_use]
    pub fn compatibility(mut self, info: CompatInfo) -> Self {
        self.compatibility = Some(info);
        self
    }

    #[must_use]
    pub fn signing(mut self, severity: SigningSeverity) -> Self {
        self.signing_severity = Some(severity);
        self
    }

    pub fn id(&self) -> &ErrorId {
        &self.id
    }

    pub(crate) fn into_diagnostic(self, severity: Severity) -> Diagnostic {
        Diagnostic {
            id: self.id,
            severity,
            message: self.message,
            description: self.description,
            file: self.file,
            position: self.position,
            compatibility: self.compatibility,
            signing_severity: self.signing_severity,
        }
    }
}

impl Diagnostic {
    /// One-line rendering used by the CLI and snapshot tests.
    pub fn render(&self) -> String {
        let file = self.file.as_deref().unwrap_or("<snippet>");
        let (line, column) = self
            .position
            .map(|p| (p.line, p.column))
            .unwrap_or_default();
        format!(
            "{file}:{line}:{column}: {}: {}: {}",
            self.severity.as_str(),
            self.id,
            self.message
        )
    }
}
