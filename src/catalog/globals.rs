//! Global objects reachable from add-on scripts.

use super::{ContextTag, Entity, Finding, Hazard, HazardCall, Members, Returns};
use crate::level::{Severity, SigningSeverity};
use crate::wrapper::Wrapper;

pub const BANNED_IDENTIFIERS: &[&str] = &["newThread", "processNextEvent"];

/// JS built-ins that scripts may not replace. Their prototypes are frozen.
const BUILTINS: &[(&str, &str, &str)] = &[
    ("Object", "Object.prototype", "Object constructor"),
    ("Array", "Array.prototype", "Array constructor"),
    ("String", "String.prototype", "String constructor"),
    ("Number", "Number.prototype", "Number constructor"),
    ("Boolean", "Boolean.prototype", "Boolean constructor"),
    ("Date", "Date.prototype", "Date constructor"),
    ("RegExp", "RegExp.prototype", "RegExp constructor"),
    ("Function", "Function.prototype", "Function constructor"),
];

const READ_ONLY_VALUES: &[(&str, &str)] = &[
    ("Math", "Math namespace"),
    ("JSON", "JSON namespace"),
    ("undefined", "the undefined value"),
    ("NaN", "not-a-number"),
    ("Infinity", "positive infinity"),
];

const EVAL: Hazard = Hazard::warning("Potentially dangerous use of eval()")
    .described(&[
        "Evaluation of strings as code can lead to security vulnerabilities and \
         performance issues, even in the most innocuous of circumstances.",
    ])
    .signing(SigningSeverity::High);

const FUNCTION_CTOR: Hazard = Hazard::warning("The Function constructor is eval")
    .described(&["Building functions from strings has the same risks as eval()."])
    .signing(SigningSeverity::High);

const TIMER: Hazard = Hazard::computed(Severity::Warning, string_timer).signing(SigningSeverity::High);

const DOCUMENT_WRITE: Hazard = Hazard::warning("Use of document.write strongly discouraged")
    .described(&[
        "document.write will fail in many circumstances when used in extensions, \
         and has potentially severe security repercussions when used improperly.",
    ]);

fn string_timer(call: &HazardCall<'_>) -> Option<Finding> {
    let timer = call.path.rsplit('.').next().unwrap_or(call.path);
    call.string_arg(0)?;
    Some(
        Finding::new(format!("{timer} called with a string argument"))
            .description(format!(
                "Passing a string to {timer} evaluates it as code. Pass a function instead."
            ))
            .reason(timer.to_string()),
    )
}

fn require_module(args: &[Wrapper]) -> Option<&'static str> {
    match args.first()?.string_value()?.as_str() {
        "chrome" => Some("require.chrome"),
        _ => None,
    }
}

pub(super) fn entities() -> Vec<(&'static str, Entity)> {
    let mut out = vec![
        ("eval", Entity::new("evaluate a string as code").on_call(EVAL)),
        (
            "execScript",
            Entity::new("IE-style script evaluation")
                .on_call(Hazard::warning("execScript evaluates strings as code")),
        ),
        ("setTimeout", Entity::new("timer").on_call(TIMER)),
        ("setInterval", Entity::new("repeating timer").on_call(TIMER)),
        (
            "window",
            Entity::new("the chrome window; exposes every global")
                .members(Members::Globals)
                .read_only(),
        ),
        (
            "content",
            Entity::new("the active content window")
                .members(Members::Globals)
                .context(ContextTag::Content)
                .read_only(),
        ),
        ("document", Entity::new("the current document").read_only()),
        ("document.write", Entity::new("write markup into the document").on_call(DOCUMENT_WRITE)),
        ("document.writeln", Entity::new("write markup into the document").on_call(DOCUMENT_WRITE)),
        ("gBrowser", Entity::new("tabbrowser element")),
        (
            "gBrowser.contentWindow",
            Entity::new("content window of the selected tab")
                .alias("content")
                .context(ContextTag::Content),
        ),
        (
            "gBrowser.contentDocument",
            Entity::new("content document of the selected tab")
                .alias("document")
                .context(ContextTag::Content),
        ),
        (
            "Components",
            Entity::new("XPCOM entry point").chrome().read_only(),
        ),
        (
            "Components.classes",
            Entity::new("XPCOM class registry")
                .members(Members::Any("Components.classes.*"))
                .chrome(),
        ),
        ("Components.classes.*", Entity::new("an XPCOM class").chrome()),
        (
            "Components.classes.*.createInstance",
            Entity::new("instantiate an XPCOM class").returns(Returns::InterfaceArg),
        ),
        (
            "Components.classes.*.getService",
            Entity::new("get an XPCOM service").returns(Returns::InterfaceArg),
        ),
        (
            "Components.interfaces",
            Entity::new("XPCOM interface registry")
                .members(Members::Interfaces)
                .chrome(),
        ),
        ("Components.utils", Entity::new("XPConnect utilities").chrome()),
        (
            "Components.utils.evalInSandbox",
            Entity::new("evaluate code in a sandbox").on_call(
                Hazard::warning("Use of evalInSandbox is potentially dangerous")
                    .described(&["Code evaluated in a sandbox can still reach privileged objects."])
                    .signing(SigningSeverity::High),
            ),
        ),
        ("Components.utils.import", Entity::new("import a JavaScript module")),
        ("Components.manager", Entity::new("component manager").chrome()),
        ("Components.results", Entity::new("XPCOM result codes").chrome()),
        ("Cc", Entity::new("Components.classes shorthand").alias("Components.classes")),
        ("Ci", Entity::new("Components.interfaces shorthand").alias("Components.interfaces")),
        ("Cu", Entity::new("Components.utils shorthand").alias("Components.utils")),
        ("Cr", Entity::new("Components.results shorthand").alias("Components.results")),
        ("Services", Entity::new("Services.jsm service getters").chrome()),
        ("Services.prefs", Entity::new("preference service").alias("nsIPrefBranch")),
        ("Services.obs", Entity::new("observer service").alias("nsIObserverService")),
        ("Services.wm", Entity::new("window mediator").alias("nsIWindowMediator")),
        ("Services.ww", Entity::new("window watcher").alias("nsIWindowWatcher")),
        (
            "Services.scriptloader",
            Entity::new("subscript loader").alias("mozIJSSubScriptLoader"),
        ),
        ("Services.io", Entity::new("IO service").alias("nsIIOService")),
        ("Services.dirsvc", Entity::new("directory service").alias("nsIProperties")),
        ("XPCNativeWrapper", Entity::new("native wrapper constructor")),
        (
            "XPCNativeWrapper.unwrap",
            Entity::new("strip a native wrapper").on_call(
                Hazard::warning("Unwrapping a native wrapper exposes content objects")
                    .described(&["Unwrapped content objects may run content code with chrome privileges."]),
            ),
        ),
        ("netscape", Entity::new("legacy netscape namespace")),
        ("netscape.security", Entity::new("legacy security namespace")),
        ("netscape.security.PrivilegeManager", Entity::new("legacy privilege manager")),
        (
            "netscape.security.PrivilegeManager.enablePrivilege",
            Entity::new("request elevated privileges").on_call(
                Hazard::error("enablePrivilege is not allowed")
                    .described(&["Scripts may not request elevated privileges at runtime."]),
            ),
        ),
        (
            "require",
            Entity::new("SDK module loader").returns(Returns::Computed(require_module)),
        ),
        ("require.chrome", Entity::new("SDK chrome module").chrome()),
        ("require.chrome.Cc", Entity::new("SDK Components.classes").alias("Components.classes")),
        ("require.chrome.Ci", Entity::new("SDK Components.interfaces").alias("Components.interfaces")),
        ("require.chrome.Cu", Entity::new("SDK Components.utils").alias("Components.utils")),
        ("require.chrome.Cr", Entity::new("SDK Components.results").alias("Components.results")),
        ("require.chrome.components", Entity::new("SDK Components").alias("Components")),
    ];

    for &(name, prototype, summary) in BUILTINS {
        let entity = Entity::new(summary).read_only();
        let entity = if name == "Function" {
            entity.on_call(FUNCTION_CTOR)
        } else {
            entity
        };
        out.push((name, entity));
        out.push((prototype, Entity::new("native prototype").frozen()));
    }
    for &(name, summary) in READ_ONLY_VALUES {
        out.push((name, Entity::new(summary).read_only()));
    }
    out
}
