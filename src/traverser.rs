//! Recursive-descent driver over one ESTree program.
//!
//! A [`Traverser`] owns the scope stack and a deferred queue of function
//! bodies for a single script; everything it finds goes to the borrowed
//! [`ErrorBundle`]. The hazard catalog is shared read-only.

use crate::actions::{self, node_spec};
use crate::ast::{JsNode, NodeKind};
use crate::bundle::ErrorBundle;
use crate::catalog::{self, GlobalRef, Hazard, HazardCall, HazardCatalog, Members};
use crate::compat::CompatContext;
use crate::diagnostics::{ErrorId, Position, Report};
use crate::level::Severity;
use crate::metadata::{Metadata, REQUIRES_CHROME};
use crate::scope::{ContextRef, DeclKind, ScopeStack};
use crate::value::Literal;
use crate::wrapper::Wrapper;
use crate::{instrument_block, trace_debug};
use itertools::Itertools;
use serde_json::Value;
use std::collections::VecDeque;

/// Nodes nested deeper than this are not analyzed.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Unexempted top-level bindings tolerated before reporting pollution.
pub const POLLUTION_LIMIT: usize = 3;

/// Conventional top-level names that never count as pollution.
pub const POLLUTION_EXEMPT: &[&str] = &[
    "window",
    "Components",
    "Cc",
    "Ci",
    "Cu",
    "Cr",
    "Services",
    "EXPORTED_SYMBOLS",
    "exports",
    "module",
    "require",
    "console",
    "gBrowser",
    "document",
];

struct DeferredFunction<'a> {
    node: JsNode<'a>,
    scopes: Vec<ContextRef>,
    position: Option<Position>,
}

pub struct Traverser<'a> {
    catalog: &'a HazardCatalog,
    bundle: &'a mut ErrorBundle,
    filename: Option<String>,
    scopes: ScopeStack,
    deferred: VecDeque<DeferredFunction<'a>>,
    position: Option<Position>,
    depth: usize,
    function_depth: usize,
    nesting_reported: bool,
    is_module: bool,
    pollution_check: bool,
}

impl<'a> Traverser<'a> {
    pub fn new(bundle: &'a mut ErrorBundle) -> Self {
        Self {
            catalog: catalog::global(),
            bundle,
            filename: None,
            scopes: ScopeStack::new(),
            deferred: VecDeque::new(),
            position: None,
            depth: 0,
            function_depth: 0,
            nesting_reported: false,
            is_module: false,
            pollution_check: true,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: &'a HazardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        if filename.ends_with(".jsm") || filename.ends_with(".mjs") {
            self.is_module = true;
        }
        self.filename = Some(filename);
        self
    }

    /// Snippets (inline handlers, `javascript:` URLs) skip whole-script checks.
    #[must_use]
    pub fn with_pollution_check(mut self, enabled: bool) -> Self {
        self.pollution_check = enabled;
        self
    }

    pub fn catalog(&self) -> &'a HazardCatalog {
        self.catalog
    }

    pub fn metadata(&self) -> &Metadata {
        &self.bundle.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.bundle.metadata
    }

    pub fn compat(&self) -> &CompatContext {
        &self.bundle.compat
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeStack {
        &mut self.scopes
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn is_module(&self) -> bool {
        self.is_module
    }

    pub fn mark_module(&mut self) {
        self.is_module = true;
    }

    pub fn in_function(&self) -> bool {
        self.function_depth > 0
    }

    /// Analyze a whole program: top-level pass, deferred function bodies,
    /// then whole-script checks.
    pub fn run(&mut self, ast: &'a Value) {
        let Some(root) = JsNode::new(ast) else {
            trace_debug!("input is not an ESTree node");
            return;
        };
        instrument_block!("run", {
            if root.str_field("sourceType") == Some("module") {
                self.is_module = true;
            }
            self.traverse(root);
            self.drain_deferred();
            if self.scopes.root().borrow().has("EXPORTED_SYMBOLS") {
                self.is_module = true;
            }
            if self.pollution_check && root.kind() == NodeKind::Program {
                self.check_namespace_pollution();
            }
        })
    }

    /// Visit one node and return its value.
    pub fn traverse(&mut self, node: JsNode<'a>) -> Wrapper {
        if self.depth >= MAX_NESTING_DEPTH {
            self.report_nesting();
            return Wrapper::dirty();
        }

        let kind = node.kind();
        let spec = node_spec(kind);
        trace_debug!(kind = kind.as_str(), depth = self.depth, "dispatch");

        let saved_position = self.position;
        if let Some(position) = node.position() {
            self.position = Some(position);
        }
        self.depth += 1;

        let pushed = if spec.establishes_context {
            self.scopes.push_function();
            true
        } else if spec.block_level {
            self.scopes.push_block();
            true
        } else {
            false
        };

        let result = match spec.action {
            Some(action) => Some(action(self, node)),
            None => {
                for branch in spec.branches {
                    for child in node.children(branch) {
                        self.traverse(child);
                    }
                }
                None
            }
        };

        if pushed {
            self.scopes.pop();
        }
        self.depth -= 1;
        self.position = saved_position;

        match result {
            Some(value) if spec.returns_value => value,
            _ => Wrapper::dirty(),
        }
    }

    fn report_nesting(&mut self) {
        if self.nesting_reported {
            return;
        }
        self.nesting_reported = true;
        self.notice(
            Report::new(
                ErrorId::js("traverser", "too_deeply_nested"),
                "Code is too deeply nested to analyze",
            )
            .description([format!(
                "Nesting beyond {MAX_NESTING_DEPTH} levels was skipped; findings may be incomplete."
            )]),
        );
    }

    /// Queue a function body; it runs against the scopes visible now.
    pub(crate) fn defer_function(&mut self, node: JsNode<'a>) {
        self.deferred.push_back(DeferredFunction {
            node,
            scopes: self.scopes.snapshot(),
            position: self.position,
        });
    }

    fn drain_deferred(&mut self) {
        let mut drained = 0usize;
        while let Some(job) = self.deferred.pop_front() {
            drained += 1;
            let saved_scopes = self.scopes.replace(job.scopes);
            let saved_position = self.position;
            let saved_depth = self.depth;
            self.position = job.position;
            self.depth = 0;
            self.function_depth += 1;

            actions::function_body(self, job.node);

            self.function_depth -= 1;
            self.depth = saved_depth;
            self.position = saved_position;
            self.scopes.replace(saved_scopes);
        }
        trace_debug!(functions = drained, "deferred queue drained");
    }

    /// Resolve a bare identifier: scopes first, then the catalog.
    pub fn resolve_identifier(&mut self, name: &str) -> Wrapper {
        if self.catalog.banned_identifier(name) {
            self.report_banned(name);
        }
        self.resolve_identifier_quiet(name)
    }

    /// [`Self::resolve_identifier`] without the banned-identifier report, for
    /// reads of an assignment target that the write reports instead.
    pub fn resolve_identifier_quiet(&mut self, name: &str) -> Wrapper {
        if let Some(bound) = self.scopes.lookup(name) {
            return bound;
        }
        match name {
            "undefined" => return Wrapper::literal(Literal::Undefined),
            "NaN" => return Wrapper::literal(f64::NAN),
            "Infinity" => return Wrapper::literal(f64::INFINITY),
            _ => {}
        }
        if self.catalog.lookup_global(name).is_some() {
            return self.materialize(name.to_string(), None);
        }
        Wrapper::dirty()
    }

    /// `this` at the top level is the chrome window.
    pub fn this_value(&mut self) -> Wrapper {
        if self.in_function() {
            Wrapper::dirty()
        } else {
            self.materialize("window".to_string(), None)
        }
    }

    /// Build a global wrapper for a catalog path, firing read hazards and
    /// metadata side effects.
    pub fn materialize(&mut self, path: String, inherited: Option<catalog::ContextTag>) -> Wrapper {
        let catalog = self.catalog;
        let direct = catalog.entity(&path);
        let resolved = catalog.resolved(&path);

        let context = direct
            .and_then(|e| e.context)
            .or_else(|| resolved.and_then(|e| e.context))
            .or(inherited);
        if direct.is_some_and(|e| e.requires_chrome) || resolved.is_some_and(|e| e.requires_chrome) {
            self.bundle.metadata.set(REQUIRES_CHROME, true);
        }
        if let Some(hazard) = resolved.and_then(|e| e.on_read) {
            self.raise_hazard(&path, &hazard, &[]);
        }

        let lazy = resolved.is_some_and(|e| matches!(e.members, Members::Any(_)));
        Wrapper::global(GlobalRef { path, context }, lazy)
    }

    /// `global.name` for a catalog wrapper.
    pub fn global_member(&mut self, global: &GlobalRef, name: &str) -> Wrapper {
        let catalog = self.catalog;
        let exposes_globals = catalog
            .resolved(&global.path)
            .is_some_and(|e| e.members == Members::Globals);
        if exposes_globals
            && !global.is_content()
            && let Some(bound) = self.scopes.root().borrow().get(name)
        {
            return bound;
        }
        match catalog.child_path(&global.path, name) {
            Some(path) => self.materialize(path, global.context),
            None => Wrapper::dirty(),
        }
    }

    /// Handle `global.name = value`. Returns true when the write was
    /// consumed (reported, or redirected to a global binding).
    pub fn set_global_member(&mut self, global: &GlobalRef, name: &str, value: &Wrapper) -> bool {
        let catalog = self.catalog;
        if catalog.is_frozen(&global.path) {
            let target = catalog.resolve(&global.path).to_string();
            self.warning(
                Report::new(
                    ErrorId::js("prototype_extension", target.clone()),
                    format!("Extension of native prototype {target}"),
                )
                .description([format!(
                    "Adding `{name}` to a native prototype changes the behaviour of every script in the process."
                )]),
            );
            return true;
        }

        let exposes_globals = catalog
            .resolved(&global.path)
            .is_some_and(|e| e.members == Members::Globals);
        if exposes_globals && !global.is_content() {
            let value = match catalog.property(name).and_then(|p| p.on_set) {
                Some(setter) => setter(self, &Wrapper::property(name, None), value.clone()),
                None => value.clone(),
            };
            self.assign_identifier(name, value);
            return true;
        }

        if let Some(child) = catalog.child_path(&global.path, name)
            && catalog.is_read_only(&child)
        {
            self.report_global_overwrite(&child);
            return true;
        }
        false
    }

    /// Assignment to a bare identifier.
    pub fn assign_identifier(&mut self, name: &str, value: Wrapper) {
        if self.catalog.banned_identifier(name) {
            self.report_banned(name);
            return;
        }
        if let Some(existing) = self.scopes.lookup(name) {
            existing.set(self, value, false);
            return;
        }
        if self.catalog.lookup_global(name).is_some_and(|e| e.read_only) {
            self.report_global_overwrite(name);
            return;
        }
        self.scopes
            .declare(name, Wrapper::copy_of(&value), DeclKind::Glob);
    }

    /// Call `callee`. `method` carries the receiver and property name when
    /// the callee came from a member expression.
    pub fn invoke(
        &mut self,
        callee: &Wrapper,
        method: Option<(Wrapper, String)>,
        args: Vec<Wrapper>,
    ) -> Wrapper {
        if let Some((receiver, name)) = method
            && let Some(hook) = self.catalog.call_hook(&name)
        {
            let site = catalog::CallSite {
                method: name,
                receiver,
                args: args.clone(),
            };
            if let Some(result) = hook(self, &site) {
                return result;
            }
        }

        let Some(global) = callee.global_ref() else {
            return Wrapper::dirty();
        };
        let catalog = self.catalog;
        let Some(entity) = catalog.resolved(&global.path) else {
            return Wrapper::dirty();
        };
        if let Some(hazard) = entity.on_call {
            self.raise_hazard(&global.path, &hazard, &args);
        }
        match entity.returns {
            catalog::Returns::Dirty => Wrapper::dirty(),
            catalog::Returns::Path(path) => self.materialize(path.to_string(), global.context),
            catalog::Returns::InterfaceArg => args
                .first()
                .and_then(Wrapper::global_ref)
                .map(|g| Wrapper::global(g, false))
                .unwrap_or_else(Wrapper::dirty),
            catalog::Returns::Computed(compute) => match compute(&args) {
                Some(path) => self.materialize(path.to_string(), global.context),
                None => Wrapper::dirty(),
            },
        }
    }

    /// Evaluate a hazard against the current call and report it if it applies.
    pub fn raise_hazard(&mut self, path: &str, hazard: &Hazard, args: &[Wrapper]) {
        let call = HazardCall {
            path,
            args,
            metadata: &self.bundle.metadata,
            compat: &self.bundle.compat,
        };
        let Some(finding) = hazard.finding(&call) else {
            return;
        };
        let severity = finding.severity.unwrap_or(hazard.severity);
        let compat = if hazard.applies.versions.is_empty() {
            None
        } else {
            self.bundle
                .compat
                .compat_info(hazard.applies.versions, severity)
        };

        let reason = finding
            .reason
            .unwrap_or_else(|| hazard.reason.unwrap_or(path).to_string());
        let mut report = Report::new(ErrorId::js(hazard.function, reason), finding.message)
            .description(finding.description);
        if let Some(signing) = hazard.signing {
            report = report.signing(signing);
        }
        if let Some(info) = compat {
            report = report.compatibility(info);
        }
        self.report(severity, report);
    }

    pub fn report_global_overwrite(&mut self, path: &str) {
        self.warning(
            Report::new(
                ErrorId::js("global_overwrite", path.to_string()),
                format!("Global variable overwrite: {path}"),
            )
            .description([
                "An attempt was made to overwrite a global variable that cannot be replaced."
                    .to_string(),
            ]),
        );
    }

    fn report_banned(&mut self, name: &str) {
        self.error(
            Report::new(
                ErrorId::js("assignment", "banned_identifier"),
                format!("Banned identifier used: {name}"),
            )
            .description([format!("`{name}` may not be used by add-ons.")]),
        );
    }

    fn check_namespace_pollution(&mut self) {
        let metadata = &self.bundle.metadata;
        if self.is_module || metadata.is_jetpack() || metadata.is_bootstrapped() {
            return;
        }
        let names: Vec<String> = self
            .scopes
            .root_names()
            .into_iter()
            .filter(|name| !POLLUTION_EXEMPT.contains(&name.as_str()))
            .collect();
        if names.len() <= POLLUTION_LIMIT {
            return;
        }
        self.position = None;
        self.notice(
            Report::new(
                ErrorId::js("traverser", "namespace_pollution"),
                "JavaScript namespace pollution",
            )
            .description([
                format!(
                    "Your add-on defines {} global variables: {}",
                    names.len(),
                    names.iter().join(", ")
                ),
                "Wrap top-level code in a function or a single namespace object.".to_string(),
            ]),
        );
    }

    /// Attach the current file and position and push to the sink.
    pub fn report(&mut self, severity: Severity, report: Report) {
        let report = report.at(self.filename.clone(), self.position);
        self.bundle.push(severity, report);
    }

    pub fn error(&mut self, report: Report) {
        self.report(Severity::Error, report);
    }

    pub fn warning(&mut self, report: Report) {
        self.report(Severity::Warning, report);
    }

    pub fn notice(&mut self, report: Report) {
        self.report(Severity::Notice, report);
    }
}
