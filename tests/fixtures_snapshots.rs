use insta::assert_snapshot;
use serde_json::json;
use xpi_lint::compat::FIREFOX_GUID;
use xpi_lint::{CompatContext, Diagnostic, Engine, Metadata};

fn format_diags(diags: &[Diagnostic]) -> String {
    let mut lines: Vec<String> = diags.iter().map(Diagnostic::render).collect();
    lines.sort();
    lines.join("\n")
}

fn analyze(engine: &Engine, src: &str, name: &str) -> String {
    let bundle = engine
        .analyze_named(src, Some(name))
        .expect("analysis should succeed");
    format_diags(bundle.diagnostics())
}

#[test]
fn overlay_script() {
    let src = include_str!("fixtures/scripts/overlay.js.json");
    assert_snapshot!(analyze(&Engine::new(), src, "overlay.js"), @r###"
    overlay.js:2:0: warning: javascript/preferences/banned_pref: Potentially unsafe preference branch referenced
    overlay.js:3:0: warning: javascript/set_innerHTML/event_assignment: Event handler assignment via innerHTML
    overlay.js:4:0: warning: javascript/dangerous_global/setTimeout: setTimeout called with a string argument
    "###);
}

#[test]
fn bootstrap_script_with_bootstrap_metadata() {
    let src = include_str!("fixtures/scripts/bootstrap.js.json");
    let mut metadata = Metadata::new();
    metadata.set("em:bootstrap", json!(true));
    let engine = Engine::new().with_metadata(metadata);
    assert_snapshot!(analyze(&engine, src, "bootstrap.js"), @r###"
    bootstrap.js:2:2: notice: javascript/dangerous_global/nsIObserverService.addObserver: bootstrapped add-ons must clean up added observers
    bootstrap.js:3:2: notice: javascript/dangerous_global/nsIWindowWatcher.registerNotification: bootstrapped add-ons must clean up added observers
    "###);
}

#[test]
fn bootstrap_script_without_bootstrap_metadata() {
    let src = include_str!("fixtures/scripts/bootstrap.js.json");
    assert_snapshot!(analyze(&Engine::new(), src, "bootstrap.js"), @r###""###);
}

#[test]
fn module_against_recent_firefox() {
    let src = include_str!("fixtures/scripts/helper.jsm.json");
    let engine = Engine::new().with_compat(CompatContext::new().with_target(FIREFOX_GUID, "21.0"));
    assert_snapshot!(analyze(&engine, src, "helper.jsm"), @r###"
    helper.jsm:3:24: warning: javascript/dangerous_global/eval: Potentially dangerous use of eval()
    helper.jsm:5:0: warning: javascript/compat/nsIPrivateBrowsingService: nsIPrivateBrowsingService has been removed
    "###);
}

#[test]
fn module_without_targets() {
    let src = include_str!("fixtures/scripts/helper.jsm.json");
    assert_snapshot!(analyze(&Engine::new(), src, "helper.jsm"), @r###"helper.jsm:3:24: warning: javascript/dangerous_global/eval: Potentially dangerous use of eval()"###);
}
