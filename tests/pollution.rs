mod support;

use serde_json::{Value, json};
use support::*;
use xpi_lint::CompatContext;
use xpi_lint::level::Severity;

const POLLUTION: &str = "javascript/traverser/namespace_pollution";

fn globals(names: &[&str]) -> Vec<Value> {
    names
        .iter()
        .map(|name| decl("var", name, Some(lit(1))))
        .collect()
}

#[test]
fn four_globals_pollute() {
    let diags = analyze(&program(globals(&["a", "b", "c", "d"])));
    assert_eq!(ids(&diags), vec![POLLUTION]);
    assert_eq!(diags[0].severity, Severity::Notice);
    assert_eq!(
        diags[0].description[0],
        "Your add-on defines 4 global variables: a, b, c, d"
    );
}

#[test]
fn three_globals_are_tolerated() {
    assert!(analyze(&program(globals(&["a", "b", "c"]))).is_empty());
}

#[test]
fn conventional_names_are_exempt() {
    let mut body = globals(&["a", "b", "c"]);
    body.push(decl("var", "Cc", Some(path("Components.classes"))));
    body.push(decl("var", "Ci", Some(path("Components.interfaces"))));
    assert_eq!(count(&analyze(&program(body)), POLLUTION), 0);
}

#[test]
fn implicit_globals_from_functions_count() {
    let mut body = globals(&["a", "b"]);
    body.push(function(
        "init",
        &[],
        vec![expr(assign(ident("leaked"), lit(true)))],
    ));
    let diags = analyze(&program(body));
    assert_eq!(count(&diags, POLLUTION), 1);
    assert!(diags[0].description[0].contains("leaked"));
}

#[test]
fn bootstrapped_addons_are_exempt() {
    let engine = engine_with(&[("em:bootstrap", json!(true))], CompatContext::new());
    let diags = analyze_with(&engine, &program(globals(&["a", "b", "c", "d"])));
    assert!(diags.is_empty());
}

#[test]
fn sdk_addons_are_exempt() {
    let engine = engine_with(&[("is_jetpack", json!(true))], CompatContext::new());
    let diags = analyze_with(&engine, &program(globals(&["a", "b", "c", "d"])));
    assert!(diags.is_empty());
}

#[test]
fn modules_are_exempt() {
    let mut ast = program(globals(&["a", "b", "c", "d"]));
    ast["sourceType"] = json!("module");
    assert!(analyze(&ast).is_empty());
}

#[test]
fn exported_symbols_mark_a_module() {
    let mut body = globals(&["a", "b", "c", "d"]);
    body.push(decl("var", "EXPORTED_SYMBOLS", Some(json!({
        "type": "ArrayExpression",
        "elements": [lit("a")]
    }))));
    assert!(analyze(&program(body)).is_empty());
}
