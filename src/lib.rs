//! Abstract-interpretation engine for add-on JavaScript.
//!
//! The crate walks ESTree JSON produced by an external parser, propagates
//! literal values through scopes, and reports hazardous API use against the
//! [`catalog::HazardCatalog`]. `Engine` bundles the per-run settings the way
//! a lint engine would; [`analyze_json`] and [`analyze_ast`] are the
//! lower-level entry points.

#![allow(clippy::new_without_default)] // Engine::new() reads as explicit construction

pub mod actions;
pub mod ast;
pub mod bundle;
pub mod catalog;
pub mod cli;
pub mod compat;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod level;
pub mod metadata;
pub mod scope;
pub mod telemetry;
pub mod traverser;
pub mod value;
pub mod wrapper;

use serde_json::Value;
use std::path::Path;

pub use crate::bundle::{ErrorBundle, LintSettings};
pub use crate::compat::CompatContext;
pub use crate::diagnostics::{Diagnostic, ErrorId};
pub use crate::error::{XpiLintError, XpiResult};
pub use crate::metadata::Metadata;
pub use crate::traverser::Traverser;

/// Run the engine over a parsed ESTree document.
pub fn analyze_ast(ast: &Value, bundle: &mut ErrorBundle) {
    let mut traverser = Traverser::new(bundle);
    traverser.run(ast);
}

/// Parse ESTree JSON and run the engine. Malformed JSON is the only error.
pub fn analyze_json(text: &str, bundle: &mut ErrorBundle) -> XpiResult<()> {
    let ast: Value = serde_json::from_str(text)?;
    analyze_ast(&ast, bundle);
    Ok(())
}

/// Settings shared by every file of one validation run.
#[derive(Debug, Clone)]
pub struct Engine {
    settings: LintSettings,
    metadata: Metadata,
    compat: CompatContext,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            settings: LintSettings::default(),
            metadata: Metadata::new(),
            compat: CompatContext::new(),
        }
    }

    /// Engine with explicit identifier overrides (e.g. from config).
    pub fn new_with_settings(settings: LintSettings) -> Self {
        Self {
            settings,
            ..Self::new()
        }
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

    /// Fresh sink seeded with this engine's settings, metadata and targets.
    pub fn bundle(&self) -> ErrorBundle {
        ErrorBundle::new()
            .with_settings(self.settings.clone())
            .with_metadata(self.metadata.clone())
            .with_compat(self.compat.clone())
    }

    /// Analyze one in-memory ESTree document.
    pub fn analyze_source(&self, json: &str) -> XpiResult<ErrorBundle> {
        self.analyze_named(json, None)
    }

    /// Analyze one ESTree document, tagging findings with `filename`.
    pub fn analyze_named(&self, json: &str, filename: Option<&str>) -> XpiResult<ErrorBundle> {
        let ast: Value = serde_json::from_str(json)?;
        if ast.get("type").and_then(Value::as_str).is_none() {
            crate::xpi_bail!("input is not an ESTree node (missing `type`)");
        }
        let mut bundle = self.bundle();
        {
            let mut traverser = Traverser::new(&mut bundle);
            if let Some(filename) = filename {
                traverser = traverser.with_filename(filename);
            }
            traverser.run(&ast);
        }
        Ok(bundle)
    }

    /// Analyze an ESTree JSON file from disk.
    pub fn analyze_file(&self, path: &Path) -> XpiResult<ErrorBundle> {
        let json = std::fs::read_to_string(path)?;
        let name = source_name(path);
        self.analyze_named(&json, Some(&name))
    }
}

/// `foo.js.json` / `foo.jsm.estree.json` report as `foo.js` / `foo.jsm`.
pub fn source_name(path: &Path) -> String {
    let display = path.display().to_string();
    let trimmed = display
        .strip_suffix(".estree.json")
        .or_else(|| display.strip_suffix(".json"))
        .unwrap_or(&display);
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn source_names_drop_json_suffixes() {
        assert_eq!(source_name(&PathBuf::from("a/b.js.json")), "a/b.js");
        assert_eq!(source_name(&PathBuf::from("lib.jsm.estree.json")), "lib.jsm");
        assert_eq!(source_name(&PathBuf::from("plain.json")), "plain");
    }

    #[test]
    fn non_node_documents_are_rejected() {
        let err = Engine::new().analyze_source("[1, 2]").unwrap_err();
        assert!(matches!(err, XpiLintError::Other(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut bundle = ErrorBundle::new();
        let err = analyze_json("{not json", &mut bundle).unwrap_err();
        assert!(matches!(err, XpiLintError::Ast(_)));
        assert!(bundle.diagnostics().is_empty());
    }
}
