//! XPCOM interfaces (`nsI*`) and their hazardous members.

use super::{Entity, Finding, Hazard, HazardCall};
use crate::compat::VersionRange;
use crate::level::{Severity, SigningSeverity};

/// Preference branches add-ons must not modify.
pub const BANNED_PREF_BRANCHES: &[&str] = &[
    "app.update.",
    "browser.addon-watch.",
    "capability.policy.",
    "datareporting.",
    "extensions.blocklist.",
    "extensions.checkCompatibility",
    "extensions.getAddons.",
    "extensions.update.",
    "general.useragent.",
    "network.http.",
    "network.websocket.",
    "nglayout.debug.",
    "security.",
    "xpinstall.signatures.required",
];

const PREF_SETTERS: &[&str] = &[
    "nsIPrefBranch.setBoolPref",
    "nsIPrefBranch.setCharPref",
    "nsIPrefBranch.setIntPref",
    "nsIPrefBranch.setComplexValue",
    "nsIPrefBranch.clearUserPref",
    "nsIPrefBranch.deleteBranch",
    "nsIPrefBranch.lockPref",
];

const PREFS: Hazard = Hazard::computed(Severity::Warning, banned_pref)
    .id("preferences", "banned_pref")
    .signing(SigningSeverity::High);

const OBSERVER_CLEANUP: Hazard = Hazard::notice("bootstrapped add-ons must clean up added observers")
    .described(&[
        "Observers registered by bootstrapped add-ons must be removed when the add-on \
         is disabled or uninstalled.",
    ])
    .bootstrap_only();

const LISTENER_CLEANUP: Hazard = Hazard::notice("bootstrapped add-ons must clean up registered listeners")
    .described(&["Listeners must be unregistered from the bootstrap shutdown() function."])
    .bootstrap_only();

const SHEET_CLEANUP: Hazard = Hazard::notice("bootstrapped add-ons must unregister style sheets")
    .described(&["Call unregisterSheet() from the bootstrap shutdown() function."])
    .bootstrap_only();

const FACTORY_CLEANUP: Hazard = Hazard::notice("bootstrapped add-ons must unregister factories")
    .described(&["Call unregisterFactory() from the bootstrap shutdown() function."])
    .bootstrap_only();

const PROCESS: Hazard = Hazard::warning("nsIProcess launches external programs")
    .described(&["Running external processes is rarely necessary and easily abused."])
    .signing(SigningSeverity::High);

const NSIJSON_REMOVED: &[VersionRange] = &[VersionRange::firefox("7.0a1")];
const PRIVATE_BROWSING_REMOVED: &[VersionRange] = &[VersionRange::firefox("20.0a1")];
const GLOBAL_HISTORY_REMOVED: &[VersionRange] = &[VersionRange::firefox("22.0a1")];
const DOWNLOAD_MANAGER_REMOVED: &[VersionRange] = &[VersionRange::firefox("26.0a1")];

fn banned_pref(call: &HazardCall<'_>) -> Option<Finding> {
    let pref = call.string_arg(0)?;
    let branch = BANNED_PREF_BRANCHES
        .iter()
        .find(|branch| pref.starts_with(**branch))?;
    Some(
        Finding::new("Potentially unsafe preference branch referenced")
            .description(format!("Preference `{pref}` is in the protected branch `{branch}`."))
            .description("Extensions should not modify preferences in this branch."),
    )
}

fn remote_subscript(call: &HazardCall<'_>) -> Option<Finding> {
    let Some(url) = call.string_arg(0) else {
        return Some(
            Finding::new("loadSubScript called with a non-literal URL")
                .description("Only load scripts packaged with the add-on.")
                .severity(Severity::Notice)
                .reason("dynamic_url"),
        );
    };
    let local = ["chrome:", "resource:", "file:"];
    if local.iter().any(|scheme| url.starts_with(scheme)) {
        return None;
    }
    Some(
        Finding::new("Scripts must not be loaded from remote sources")
            .description(format!("loadSubScript() was called with `{url}`."))
            .severity(Severity::Error)
            .reason("remote_url"),
    )
}

const fn removed(range: &'static [VersionRange], message: &'static str, name: &'static str) -> Hazard {
    Hazard::warning(message)
        .id("compat", name)
        .versions(range)
}

pub(super) fn entities() -> Vec<(&'static str, Entity)> {
    let mut out = vec![
        ("nsIPrefBranch", Entity::interface("preference access")),
        ("nsIObserverService", Entity::interface("global notification bus")),
        (
            "nsIObserverService.addObserver",
            Entity::new("register an observer").on_call(OBSERVER_CLEANUP),
        ),
        ("nsIWindowMediator", Entity::interface("window enumeration")),
        (
            "nsIWindowMediator.addListener",
            Entity::new("register a window listener").on_call(LISTENER_CLEANUP),
        ),
        ("nsIWindowWatcher", Entity::interface("window creation")),
        (
            "nsIWindowWatcher.registerNotification",
            Entity::new("register a window observer").on_call(OBSERVER_CLEANUP),
        ),
        ("nsIStyleSheetService", Entity::interface("global style sheets")),
        (
            "nsIStyleSheetService.loadAndRegisterSheet",
            Entity::new("register a global style sheet").on_call(SHEET_CLEANUP),
        ),
        ("nsIComponentRegistrar", Entity::interface("component registration")),
        (
            "nsIComponentRegistrar.registerFactory",
            Entity::new("register an XPCOM factory").on_call(FACTORY_CLEANUP),
        ),
        ("mozIJSSubScriptLoader", Entity::interface("script loader")),
        (
            "mozIJSSubScriptLoader.loadSubScript",
            Entity::new("load and run a script")
                .on_call(Hazard::computed(Severity::Warning, remote_subscript)),
        ),
        ("nsIProcess", Entity::interface("external process")),
        ("nsIProcess.run", Entity::new("run a process").on_call(PROCESS)),
        ("nsIProcess.runw", Entity::new("run a process").on_call(PROCESS)),
        ("nsIProcess.runAsync", Entity::new("run a process").on_call(PROCESS)),
        ("nsIFile", Entity::interface("file system entry")),
        (
            "nsIFile.launch",
            Entity::new("open a file with the system handler").on_call(
                Hazard::warning("nsIFile.launch executes files")
                    .described(&["Launching files hands them to the operating system."])
                    .signing(SigningSeverity::High),
            ),
        ),
        ("nsISound", Entity::interface("system sounds")),
        (
            "nsISound.play",
            Entity::new("play a sound").on_call(
                Hazard::warning("nsISound.play should not be used")
                    .described(&["Use the HTML5 audio APIs instead of nsISound.play."]),
            ),
        ),
        ("nsIDNSService", Entity::interface("name resolution")),
        (
            "nsIDNSService.resolve",
            Entity::new("synchronous DNS lookup").on_call(
                Hazard::warning("Synchronous DNS lookups block the UI")
                    .described(&["Use asyncResolve() instead of resolve()."]),
            ),
        ),
        ("nsIIOService", Entity::interface("network IO")),
        ("nsIProperties", Entity::interface("directory service")),
        ("nsISupports", Entity::interface("base interface")),
        (
            "nsIJSON",
            Entity::interface("legacy JSON codec").on_read(removed(
                NSIJSON_REMOVED,
                "nsIJSON has been deprecated; use the JSON object",
                "nsIJSON",
            )),
        ),
        (
            "nsIPrivateBrowsingService",
            Entity::interface("global private browsing state").on_read(removed(
                PRIVATE_BROWSING_REMOVED,
                "nsIPrivateBrowsingService has been removed",
                "nsIPrivateBrowsingService",
            )),
        ),
        (
            "nsIGlobalHistory2",
            Entity::interface("legacy history").on_read(removed(
                GLOBAL_HISTORY_REMOVED,
                "nsIGlobalHistory2 has been removed",
                "nsIGlobalHistory2",
            )),
        ),
        (
            "nsIDownloadManager",
            Entity::interface("legacy download manager").on_read(removed(
                DOWNLOAD_MANAGER_REMOVED,
                "nsIDownloadManager has been replaced by Downloads.jsm",
                "nsIDownloadManager",
            )),
        ),
    ];

    for &setter in PREF_SETTERS {
        out.push((setter, Entity::new("modify a preference").on_call(PREFS)));
    }
    out
}
