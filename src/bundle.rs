use crate::compat::CompatContext;
use crate::diagnostics::{Diagnostic, ErrorId, Report};
use crate::level::{LintLevel, Severity};
use crate::metadata::Metadata;
use std::collections::HashMap;

/// Per-identifier severity overrides derived from `xpi-lint.toml`.
///
/// Keys are rendered identifiers (`javascript/dangerous_global/eval`) or any
/// `/`-separated prefix of one (`javascript/set_innerHTML`). The longest
/// matching key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSettings {
    levels: HashMap<String, LintLevel>,
    strict: bool,
}

impl LintSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, LintLevel>) -> Self {
        for (key, level) in levels {
            self.levels.insert(normalize_key(&key), level);
        }
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for key in disabled {
            self.levels.insert(normalize_key(&key), LintLevel::Allow);
        }
        self
    }

    /// Treat warnings as failures.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn level_for(&self, id: &ErrorId) -> Option<LintLevel> {
        let candidates = [
            id.to_string(),
            format!("{}/{}", id.namespace, id.function),
            id.namespace.to_string(),
        ];
        candidates
            .iter()
            .find_map(|key| self.levels.get(key).copied())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_end_matches('/').to_string()
}

/// Diagnostic sink shared by everything that validates one add-on.
///
/// Besides collecting findings it owns the add-on [`Metadata`] and the
/// [`CompatContext`] that version-gated hazards consult.
#[derive(Debug, Default)]
pub struct ErrorBundle {
    diagnostics: Vec<Diagnostic>,
    pub metadata: Metadata,
    pub compat: CompatContext,
    settings: LintSettings,
}

impl ErrorBundle {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(mut self, settings: LintSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_compat(mut self, compat: CompatContext) -> Self {
        self.compat = compat;
        self
    }

    pub fn error(&mut self, report: Report) {
        self.push(Severity::Error, report);
    }

    pub fn warning(&mut self, report: Report) {
        self.push(Severity::Warning, report);
    }

    pub fn notice(&mut self, report: Report) {
        self.push(Severity::Notice, report);
    }

    /// Append a finding, applying configured overrides.
    pub fn push(&mut self, severity: Severity, report: Report) {
        let severity = match self.settings.level_for(report.id()) {
            Some(level) => match level.severity() {
                Some(severity) => severity,
                None => return,
            },
            None => severity,
        };
        self.diagnostics.push(report.into_diagnostic(severity));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Whether overall validation should be considered failed.
    pub fn failed(&self) -> bool {
        self.diagnostics.iter().any(|d| {
            d.severity == Severity::Error || (self.settings.strict && d.severity == Severity::Warning)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(reason: &'static str) -> Report {
        Report::new(ErrorId::js("dangerous_global", reason), "msg")
    }

    #[test]
    fn prefix_override_remaps_severity() {
        let mut levels = HashMap::new();
        levels.insert("javascript/dangerous_global".to_string(), LintLevel::Error);
        let settings = LintSettings::default().with_config_levels(levels);
        let mut bundle = ErrorBundle::new().with_settings(settings);

        bundle.warning(report("eval"));
        assert_eq!(bundle.diagnostics()[0].severity, Severity::Error);
        assert!(bundle.failed());
    }

    #[test]
    fn exact_override_beats_prefix() {
        let mut levels = HashMap::new();
        levels.insert("javascript/dangerous_global".to_string(), LintLevel::Error);
        levels.insert("javascript/dangerous_global/eval/".to_string(), LintLevel::Allow);
        let settings = LintSettings::default().with_config_levels(levels);
        let mut bundle = ErrorBundle::new().with_settings(settings);

        bundle.warning(report("eval"));
        bundle.warning(report("Function"));
        assert_eq!(bundle.diagnostics().len(), 1);
        assert_eq!(bundle.diagnostics()[0].id.reason, "Function");
    }

    #[test]
    fn strict_mode_fails_on_warnings() {
        let mut bundle = ErrorBundle::new();
        bundle.warning(report("eval"));
        assert!(!bundle.failed());

        let mut bundle = ErrorBundle::new().with_settings(LintSettings::default().strict(true));
        bundle.warning(report("eval"));
        assert!(bundle.failed());
        assert_eq!(bundle.count(Severity::Warning), 1);
    }
}
