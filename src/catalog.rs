//! Hazard catalog: the immutable table of global objects, XPCOM interfaces
//! and instance hooks the traverser resolves names against.
//!
//! Paths are dotted strings (`Components.classes`, `nsISound.play`). The
//! table is built once per process by [`global`] and shared read-only by
//! every traverser.

pub mod globals;
pub mod instance;
pub mod interfaces;

use crate::compat::{CompatContext, VersionRange};
use crate::level::{Severity, SigningSeverity};
use crate::metadata::Metadata;
use crate::traverser::Traverser;
use crate::wrapper::{Setter, Wrapper};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Which world a global object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextTag {
    Chrome,
    Content,
}

/// Handle from a wrapper back into the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalRef {
    pub path: String,
    pub context: Option<ContextTag>,
}

impl GlobalRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            context: None,
        }
    }

    pub fn is_content(&self) -> bool {
        self.context == Some(ContextTag::Content)
    }
}

/// How member names below an entity resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Members {
    /// Only members listed as `path.member` entities.
    Listed,
    /// Every top-level global (`window`, `content`).
    Globals,
    /// Every interface entity (`Components.interfaces`).
    Interfaces,
    /// Any member name resolves to the given entity (`Components.classes[cid]`).
    Any(&'static str),
}

/// What calling an entity evaluates to.
#[derive(Debug, Clone, Copy)]
pub enum Returns {
    Dirty,
    Path(&'static str),
    /// The interface wrapper passed as the first argument.
    InterfaceArg,
    /// Path computed from the arguments, e.g. `require("chrome")`.
    Computed(fn(&[Wrapper]) -> Option<&'static str>),
}

/// Everything a computed hazard message can look at.
pub struct HazardCall<'c> {
    pub path: &'c str,
    pub args: &'c [Wrapper],
    pub metadata: &'c Metadata,
    pub compat: &'c CompatContext,
}

impl HazardCall<'_> {
    pub fn string_arg(&self, index: usize) -> Option<String> {
        self.args.get(index).and_then(Wrapper::string_value)
    }
}

/// Message produced by a hazard that decided to fire.
#[derive(Debug, Clone, Default)]
pub struct Finding {
    pub message: String,
    pub description: Vec<String>,
    pub severity: Option<Severity>,
    pub reason: Option<String>,
}

impl Finding {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, line: impl Into<String>) -> Self {
        self.description.push(line.into());
        self
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub enum HazardMessage {
    Static {
        message: &'static str,
        description: &'static [&'static str],
    },
    /// Returns `None` when the call turns out to be harmless.
    Computed(fn(&HazardCall<'_>) -> Option<Finding>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Applicability {
    pub bootstrap_only: bool,
    pub jetpack_only: bool,
    pub versions: &'static [VersionRange],
}

impl Applicability {
    pub fn matches(&self, call: &HazardCall<'_>) -> bool {
        if self.bootstrap_only && !call.metadata.is_bootstrapped() {
            return false;
        }
        if self.jetpack_only && !call.metadata.is_jetpack() {
            return false;
        }
        self.versions.is_empty() || call.compat.supports(self.versions)
    }
}

/// Why and when referencing an entity is flagged.
#[derive(Debug, Clone, Copy)]
pub struct Hazard {
    pub severity: Severity,
    pub function: &'static str,
    /// Defaults to the entity path.
    pub reason: Option<&'static str>,
    pub message: HazardMessage,
    pub applies: Applicability,
    pub signing: Option<SigningSeverity>,
}

impl Hazard {
    const fn with(severity: Severity, message: &'static str) -> Self {
        Self {
            severity,
            function: "dangerous_global",
            reason: None,
            message: HazardMessage::Static {
                message,
                description: &[],
            },
            applies: Applicability {
                bootstrap_only: false,
                jetpack_only: false,
                versions: &[],
            },
            signing: None,
        }
    }

    pub const fn error(message: &'static str) -> Self {
        Self::with(Severity::Error, message)
    }

    pub const fn warning(message: &'static str) -> Self {
        Self::with(Severity::Warning, message)
    }

    pub const fn notice(message: &'static str) -> Self {
        Self::with(Severity::Notice, message)
    }

    pub const fn computed(severity: Severity, compute: fn(&HazardCall<'_>) -> Option<Finding>) -> Self {
        let mut hazard = Self::with(severity, "");
        hazard.message = HazardMessage::Computed(compute);
        hazard
    }

    pub const fn described(mut self, lines: &'static [&'static str]) -> Self {
        if let HazardMessage::Static { message, .. } = self.message {
            self.message = HazardMessage::Static {
                message,
                description: lines,
            };
        }
        self
    }

    pub const fn id(mut self, function: &'static str, reason: &'static str) -> Self {
        self.function = function;
        self.reason = Some(reason);
        self
    }

    pub const fn bootstrap_only(mut self) -> Self {
        self.applies.bootstrap_only = true;
        self
    }

    pub const fn jetpack_only(mut self) -> Self {
        self.applies.jetpack_only = true;
        self
    }

    pub const fn versions(mut self, ranges: &'static [VersionRange]) -> Self {
        self.applies.versions = ranges;
        self
    }

    pub const fn signing(mut self, severity: SigningSeverity) -> Self {
        self.signing = Some(severity);
        self
    }

    /// Evaluate the message for a concrete reference or call.
    pub fn finding(&self, call: &HazardCall<'_>) -> Option<Finding> {
        if !self.applies.matches(call) {
            return None;
        }
        match self.message {
            HazardMessage::Static {
                message,
                description,
            } => Some(Finding {
                message: message.to_string(),
                description: description.iter().map(|s| s.to_string()).collect(),
                ..Finding::default()
            }),
            HazardMessage::Computed(compute) => compute(call),
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone)]
pub struct Entity {
    pub summary: &'static str,
    pub alias: Option<&'static str>,
    pub members: Members,
    pub read_only: bool,
    /// Writes of new members are rejected (native prototypes).
    pub frozen: bool,
    pub interface: bool,
    pub requires_chrome: bool,
    pub context: Option<ContextTag>,
    pub on_read: Option<Hazard>,
    pub on_call: Option<Hazard>,
    pub returns: Returns,
}

impl Entity {
    pub const fn new(summary: &'static str) -> Self {
        Self {
            summary,
            alias: None,
            members: Members::Listed,
            read_only: false,
            frozen: false,
            interface: false,
            requires_chrome: false,
            context: None,
            on_read: None,
            on_call: None,
            returns: Returns::Dirty,
        }
    }

    pub const fn interface(summary: &'static str) -> Self {
        let mut entity = Self::new(summary);
        entity.interface = true;
        entity
    }

    pub const fn alias(mut self, target: &'static str) -> Self {
        self.alias = Some(target);
        self
    }

    pub const fn members(mut self, members: Members) -> Self {
        self.members = members;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub const fn frozen(mut self) -> Self {
        self.frozen = true;
        self.read_only = true;
        self
    }

    pub const fn chrome(mut self) -> Self {
        self.requires_chrome = true;
        self
    }

    pub const fn context(mut self, tag: ContextTag) -> Self {
        self.context = Some(tag);
        self
    }

    pub const fn on_read(mut self, hazard: Hazard) -> Self {
        self.on_read = Some(hazard);
        self
    }

    pub const fn on_call(mut self, hazard: Hazard) -> Self {
        self.on_call = Some(hazard);
        self
    }

    pub const fn returns(mut self, returns: Returns) -> Self {
        self.returns = returns;
        self
    }

    /// True when the entity flags something on read or call.
    pub fn is_hazardous(&self) -> bool {
        self.on_read.is_some() || self.on_call.is_some()
    }
}

/// Hook run before a property read on any receiver.
pub type ReadHook = for<'a> fn(&mut Traverser<'a>, &Wrapper, &str);

/// Mutation and read hooks for one instance property name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyHook {
    pub on_set: Option<Setter>,
    pub on_read: Option<ReadHook>,
}

/// A method call on an arbitrary receiver (`x.createElement("script")`).
pub struct CallSite {
    pub method: String,
    pub receiver: Wrapper,
    pub args: Vec<Wrapper>,
}

/// Returns `Some` to replace the call's value.
pub type CallHook = for<'a> fn(&mut Traverser<'a>, &CallSite) -> Option<Wrapper>;

const MAX_ALIAS_HOPS: usize = 8;

pub struct HazardCatalog {
    entities: HashMap<&'static str, Entity>,
    banned: HashSet<&'static str>,
    properties: HashMap<&'static str, PropertyHook>,
    event_handler: PropertyHook,
    calls: HashMap<&'static str, CallHook>,
}

/// The process-wide catalog.
pub fn global() -> &'static HazardCatalog {
    static CATALOG: OnceLock<HazardCatalog> = OnceLock::new();
    CATALOG.get_or_init(HazardCatalog::build)
}

impl HazardCatalog {
    pub fn build() -> Self {
        let mut entities = HashMap::new();
        for (path, entity) in globals::entities().into_iter().chain(interfaces::entities()) {
            entities.insert(path, entity);
        }
        let catalog = Self {
            entities,
            banned: globals::BANNED_IDENTIFIERS.iter().copied().collect(),
            properties: instance::property_hooks(),
            event_handler: instance::event_handler_hook(),
            calls: instance::call_hooks(),
        };
        crate::trace_debug!(
            entities = catalog.entities.len(),
            properties = catalog.properties.len(),
            calls = catalog.calls.len(),
            "hazard catalog built"
        );
        catalog
    }

    pub fn entity(&self, path: &str) -> Option<&Entity> {
        self.entities.get(path)
    }

    /// Follow aliases (`Cc` -> `Components.classes`).
    pub fn resolve<'p>(&self, path: &'p str) -> &'p str {
        let mut current = path;
        for _ in 0..MAX_ALIAS_HOPS {
            match self.entities.get(current).and_then(|e| e.alias) {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    /// Entity backing a path after alias resolution.
    pub fn resolved(&self, path: &str) -> Option<&Entity> {
        self.entity(self.resolve(path))
    }

    /// Top-level global for a bare identifier.
    pub fn lookup_global(&self, name: &str) -> Option<&Entity> {
        self.entity(name).filter(|e| !e.interface && !name.contains('.'))
    }

    /// Path of `parent.name`, if the catalog knows it.
    pub fn child_path(&self, parent: &str, name: &str) -> Option<String> {
        let parent = self.resolve(parent);
        let entity = self.entities.get(parent)?;
        let dotted = format!("{parent}.{name}");
        if self.entities.contains_key(dotted.as_str()) {
            return Some(dotted);
        }
        match entity.members {
            Members::Listed => None,
            Members::Globals => self.lookup_global(name).map(|_| name.to_string()),
            Members::Interfaces => self
                .entity(name)
                .filter(|e| e.interface)
                .map(|_| name.to_string()),
            Members::Any(path) => Some(path.to_string()),
        }
    }

    pub fn is_read_only(&self, path: &str) -> bool {
        self.entity(path).is_some_and(|e| e.read_only)
            || self.resolved(path).is_some_and(|e| e.read_only)
    }

    pub fn is_frozen(&self, path: &str) -> bool {
        self.resolved(path).is_some_and(|e| e.frozen)
    }

    pub fn banned_identifier(&self, name: &str) -> bool {
        self.banned.contains(name)
    }

    /// Hooks for an instance property. `on*` names share one hook.
    pub fn property(&self, name: &str) -> Option<&PropertyHook> {
        if let Some(hook) = self.properties.get(name) {
            return Some(hook);
        }
        is_event_handler_name(name).then_some(&self.event_handler)
    }

    pub fn call_hook(&self, method: &str) -> Option<CallHook> {
        self.calls.get(method).copied()
    }

    /// All entries, sorted by path.
    pub fn entries(&self) -> Vec<(&'static str, &Entity)> {
        let mut entries: Vec<_> = self.entities.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(path, _)| *path);
        entries
    }

    pub fn banned_identifiers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.banned.iter().copied().collect();
        names.sort_unstable();
        names
    }
}

/// `onclick`, `onload`: lowercase `on` followed by at least one letter.
pub fn is_event_handler_name(name: &str) -> bool {
    name.strip_prefix("on")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_components() {
        let catalog = global();
        assert_eq!(catalog.resolve("Cc"), "Components.classes");
        assert_eq!(catalog.resolve("Services.prefs"), "nsIPrefBranch");
        assert_eq!(catalog.resolve("not_in_catalog"), "not_in_catalog");
    }

    #[test]
    fn child_paths_follow_member_rules() {
        let catalog = global();
        assert_eq!(catalog.child_path("window", "eval").as_deref(), Some("eval"));
        assert_eq!(
            catalog.child_path("Ci", "nsIPrefBranch").as_deref(),
            Some("nsIPrefBranch")
        );
        assert_eq!(
            catalog.child_path("Cc", "@mozilla.org/sound;1").as_deref(),
            Some("Components.classes.*")
        );
        assert_eq!(
            catalog.child_path("Services.prefs", "setCharPref").as_deref(),
            Some("nsIPrefBranch.setCharPref")
        );
        assert_eq!(catalog.child_path("eval", "call"), None);
    }

    #[test]
    fn interfaces_are_not_bare_globals() {
        let catalog = global();
        assert!(catalog.lookup_global("nsIPrefBranch").is_none());
        assert!(catalog.lookup_global("eval").is_some());
    }

    #[test]
    fn event_handler_wildcard() {
        let catalog = global();
        assert!(catalog.property("onclick").is_some());
        assert!(catalog.property("on").is_none());
        assert!(catalog.property("onClick").is_none());
        assert!(catalog.property("innerHTML").is_some());
        assert!(catalog.property("textContent").is_none());
    }

    #[test]
    fn builtins_are_read_only() {
        let catalog = global();
        assert!(catalog.is_read_only("undefined"));
        assert!(catalog.is_frozen("Object.prototype"));
        assert!(!catalog.is_read_only("setTimeout"));
    }
}
