mod support;

use serde_json::json;
use support::*;
use xpi_lint::compat::FIREFOX_GUID;
use xpi_lint::level::{Severity, SigningSeverity};
use xpi_lint::{CompatContext, Engine};

#[test]
fn eval_call_reports_once() {
    let ast = program(vec![expr(call(ident("eval"), vec![lit("x")]))]);
    let diags = analyze(&ast);

    assert_eq!(ids(&diags), vec!["javascript/dangerous_global/eval"]);
    assert_eq!(diags[0].severity, Severity::Warning);
    assert_eq!(diags[0].signing_severity, Some(SigningSeverity::High));
}

#[test]
fn bare_eval_reference_is_not_a_call() {
    let ast = program(vec![decl("var", "e", Some(ident("eval")))]);
    let diags = analyze(&ast);
    assert_eq!(count(&diags, "javascript/dangerous_global/eval"), 0);
}

#[test]
fn computed_window_member_resolves_through_concatenation() {
    let callee = index(ident("window"), binary("+", lit("ev"), lit("al")));
    let ast = program(vec![expr(call(callee, vec![lit("x")]))]);
    let diags = analyze(&ast);
    assert_eq!(count(&diags, "javascript/dangerous_global/eval"), 1);
}

#[test]
fn aliased_eval_is_still_eval() {
    let ast = program(vec![
        decl("var", "e", Some(member(ident("window"), "eval"))),
        expr(call(ident("e"), vec![lit("1 + 1")])),
    ]);
    let diags = analyze(&ast);
    assert_eq!(count(&diags, "javascript/dangerous_global/eval"), 1);
}

#[test]
fn string_timers_are_flagged_and_function_timers_are_not() {
    let ast = program(vec![
        expr(call(ident("setTimeout"), vec![lit("doIt()"), lit(10)])),
        expr(call(
            ident("setInterval"),
            vec![ident("callback"), lit(10)],
        )),
    ]);
    let diags = analyze(&ast);
    assert_eq!(ids(&diags), vec!["javascript/dangerous_global/setTimeout"]);
}

#[test]
fn banned_pref_branch_via_services() {
    let ast = program(vec![expr(call(
        path("Services.prefs.setCharPref"),
        vec![lit("security.csp.enable"), lit("false")],
    ))]);
    let diags = analyze(&ast);

    assert_eq!(count(&diags, "javascript/preferences/banned_pref"), 1);
    let diag = diags
        .iter()
        .find(|d| d.id.is("javascript", "preferences", "banned_pref"))
        .expect("banned pref finding");
    assert!(diag.description.iter().any(|l| l.contains("`security.`")));
}

#[test]
fn harmless_pref_is_not_flagged() {
    let ast = program(vec![expr(call(
        path("Services.prefs.setCharPref"),
        vec![lit("extensions.myaddon.color"), lit("red")],
    ))]);
    assert!(analyze(&ast).is_empty());
}

#[test]
fn observer_cleanup_only_for_bootstrapped_addons() {
    let ast = program(vec![expr(call(
        path("Services.obs.addObserver"),
        vec![ident("observer"), lit("quit-application"), lit(false)],
    ))]);
    let id = "javascript/dangerous_global/nsIObserverService.addObserver";

    assert_eq!(count(&analyze(&ast), id), 0);

    let engine = engine_with(&[("em:bootstrap", json!(true))], CompatContext::new());
    let diags = analyze_with(&engine, &ast);
    assert_eq!(count(&diags, id), 1);
    assert_eq!(diags[0].severity, Severity::Notice);
}

#[test]
fn removed_interface_needs_a_matching_target() {
    let ast = program(vec![expr(call(
        member(
            index(path("Components.classes"), lit("@mozilla.org/dom/json;1")),
            "createInstance",
        ),
        vec![path("Components.interfaces.nsIJSON")],
    ))]);
    let id = "javascript/compat/nsIJSON";

    assert_eq!(count(&analyze(&ast), id), 0);

    let old = engine_with(&[], CompatContext::new().with_target(FIREFOX_GUID, "6.0"));
    assert_eq!(count(&analyze_with(&old, &ast), id), 0);

    let new = engine_with(&[], CompatContext::new().with_target(FIREFOX_GUID, "8.0"));
    let diags = analyze_with(&new, &ast);
    assert_eq!(count(&diags, id), 1);
    let compat = diags[0].compatibility.as_ref().expect("compat info");
    assert_eq!(compat.for_appversions[FIREFOX_GUID], vec!["8.0".to_string()]);
}

#[test]
fn created_instances_carry_their_interface() {
    let create = call(
        member(index(ident("Cc"), lit("@mozilla.org/process/util;1")), "createInstance"),
        vec![member(ident("Ci"), "nsIProcess")],
    );
    let ast = program(vec![
        decl("var", "process", Some(create)),
        expr(call(member(ident("process"), "run"), vec![lit(false)])),
    ]);
    let diags = analyze(&ast);
    assert_eq!(count(&diags, "javascript/dangerous_global/nsIProcess.run"), 1);
}

#[test]
fn query_interface_yields_the_interface() {
    let qi = call(
        member(ident("thing"), "QueryInterface"),
        vec![member(ident("Ci"), "nsIFile")],
    );
    let ast = program(vec![expr(call(member(qi, "launch"), vec![]))]);
    let diags = analyze(&ast);
    assert_eq!(count(&diags, "javascript/dangerous_global/nsIFile.launch"), 1);
}

#[test]
fn remote_subscripts_are_errors() {
    let load = |url: &str| {
        program(vec![expr(call(
            path("Services.scriptloader.loadSubScript"),
            vec![lit(url)],
        ))])
    };

    let diags = analyze(&load("https://example.com/x.js"));
    assert_eq!(ids(&diags), vec!["javascript/dangerous_global/remote_url"]);
    assert_eq!(diags[0].severity, Severity::Error);

    assert!(analyze(&load("chrome://addon/content/x.js")).is_empty());
}

#[test]
fn chrome_globals_mark_requires_chrome() {
    let ast = program(vec![decl("var", "u", Some(path("Components.utils")))]);
    let bundle = Engine::new()
        .analyze_source(&ast.to_string())
        .expect("analysis should succeed");
    assert!(bundle.metadata.requires_chrome());

    let plain = program(vec![decl("var", "x", Some(lit(1)))]);
    let bundle = Engine::new()
        .analyze_source(&plain.to_string())
        .expect("analysis should succeed");
    assert!(!bundle.metadata.requires_chrome());
}

#[test]
fn sdk_chrome_module_aliases_components() {
    let chrome = call(ident("require"), vec![lit("chrome")]);
    let ast = program(vec![
        decl("var", "c", Some(chrome)),
        expr(call(
            path("c.Cu.evalInSandbox"),
            vec![lit("code"), ident("sandbox")],
        )),
    ]);
    let diags = analyze(&ast);
    assert_eq!(
        count(&diags, "javascript/dangerous_global/Components.utils.evalInSandbox"),
        1
    );
}

#[test]
fn destructured_components_keep_their_hazards() {
    let ast = program(vec![
        json!({
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{
                "type": "VariableDeclarator",
                "id": {
                    "type": "ObjectPattern",
                    "properties": [{
                        "type": "Property",
                        "key": ident("utils"),
                        "value": ident("Cu"),
                        "computed": false,
                        "shorthand": false
                    }]
                },
                "init": ident("Components")
            }]
        }),
        expr(call(path("Cu.evalInSandbox"), vec![lit("code"), ident("sandbox")])),
    ]);
    assert_eq!(
        count(&analyze(&ast), "javascript/dangerous_global/Components.utils.evalInSandbox"),
        1
    );
}

#[test]
fn enable_privilege_is_an_error() {
    let ast = program(vec![expr(call(
        path("netscape.security.PrivilegeManager.enablePrivilege"),
        vec![lit("UniversalXPConnect")],
    ))]);
    let diags = analyze(&ast);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
}
