mod support;

use serde_json::{Value, json};
use support::*;
use xpi_lint::value::{Literal, MAX_STRING_LENGTH};
use xpi_lint::wrapper::Wrapper;
use xpi_lint::{ErrorBundle, Traverser};

fn root_wrapper(ast: &Value, name: &str) -> Option<Wrapper> {
    let mut bundle = ErrorBundle::new();
    let mut traverser = Traverser::new(&mut bundle);
    traverser.run(ast);
    traverser.scopes().lookup(name)
}

/// Run a program and return what the top-level scope ends up binding.
fn root_binding(ast: &Value, name: &str) -> Option<Literal> {
    root_wrapper(ast, name).map(|w| w.literal_value().unwrap_or(Literal::Undefined))
}

fn doubling(times: usize, operator: &str) -> Value {
    let mut body = vec![decl("var", "s", Some(lit("a")))];
    for _ in 0..times {
        let step = if operator == "+=" {
            json!({
                "type": "AssignmentExpression",
                "operator": "+=",
                "left": ident("s"),
                "right": ident("s")
            })
        } else {
            assign(ident("s"), binary("+", ident("s"), ident("s")))
        };
        body.push(expr(step));
    }
    program(body)
}

#[test]
fn var_in_block_is_visible_after_the_block() {
    let ast = program(vec![block(vec![decl("var", "y", Some(lit(2)))])]);
    assert_eq!(root_binding(&ast, "y"), Some(Literal::Number(2.0)));
}

#[test]
fn let_in_block_stays_in_the_block() {
    let ast = program(vec![block(vec![decl("let", "x", Some(lit(1)))])]);
    assert_eq!(root_binding(&ast, "x"), None);
}

#[test]
fn const_in_block_attaches_to_the_function_context() {
    let ast = program(vec![block(vec![decl("const", "k", Some(lit("v")))])]);
    assert_eq!(root_binding(&ast, "k"), Some(Literal::from("v")));
}

#[test]
fn function_locals_do_not_leak() {
    let ast = program(vec![function(
        "f",
        &["a"],
        vec![decl("var", "inner", Some(lit(1)))],
    )]);
    assert_eq!(root_binding(&ast, "inner"), None);
    assert_eq!(root_binding(&ast, "a"), None);
}

#[test]
fn undeclared_assignment_inside_function_creates_a_global() {
    let ast = program(vec![function(
        "f",
        &[],
        vec![expr(assign(ident("leaked"), lit("yes")))],
    )]);
    assert_eq!(root_binding(&ast, "leaked"), Some(Literal::from("yes")));
}

#[test]
fn window_member_assignment_is_a_global_binding() {
    let ast = program(vec![
        expr(assign(member(ident("window"), "answer"), lit(42))),
        decl("var", "copy", Some(ident("answer"))),
    ]);
    assert_eq!(root_binding(&ast, "copy"), Some(Literal::Number(42.0)));
}

#[test]
fn reassignment_is_seen_through_every_alias() {
    let ast = program(vec![
        decl("var", "box", Some(object(vec![("v", lit(1))]))),
        decl("var", "alias", Some(ident("box"))),
        expr(assign(member(ident("alias"), "v"), lit(5))),
        decl("var", "seen", Some(member(ident("box"), "v"))),
    ]);
    assert_eq!(root_binding(&ast, "seen"), Some(Literal::Number(5.0)));
}

#[test]
fn compound_assignment_folds() {
    let ast = program(vec![
        decl("var", "s", Some(lit("ev"))),
        expr(json!({
            "type": "AssignmentExpression",
            "operator": "+=",
            "left": ident("s"),
            "right": lit("al")
        })),
    ]);
    assert_eq!(root_binding(&ast, "s"), Some(Literal::from("eval")));
}

#[test]
fn function_bodies_see_later_top_level_bindings() {
    // Bodies run after the top level, against the same scope objects.
    let ast = program(vec![
        function(
            "run",
            &[],
            vec![expr(call(ident("evaluate"), vec![lit("x")]))],
        ),
        decl("var", "evaluate", Some(ident("eval"))),
    ]);
    let diags = analyze(&ast);
    assert_eq!(count(&diags, "javascript/dangerous_global/eval"), 1);
}

#[test]
fn parameters_shadow_globals() {
    let ast = program(vec![function(
        "f",
        &["eval"],
        vec![expr(call(ident("eval"), vec![lit("x")]))],
    )]);
    assert!(analyze(&ast).is_empty());
}

#[test]
fn catch_bindings_stay_in_the_clause() {
    let ast = program(vec![json!({
        "type": "TryStatement",
        "block": block(vec![]),
        "handler": {
            "type": "CatchClause",
            "param": ident("e"),
            "body": block(vec![
                decl("let", "t", Some(lit(1))),
                decl("var", "v", Some(lit(2))),
            ])
        },
        "finalizer": null
    })]);
    assert_eq!(root_binding(&ast, "e"), None);
    assert_eq!(root_binding(&ast, "t"), None);
    assert_eq!(root_binding(&ast, "v"), Some(Literal::Number(2.0)));
}

#[test]
fn with_body_scopes_let_but_not_var() {
    let ast = program(vec![
        decl("var", "o", Some(object(vec![]))),
        json!({
            "type": "WithStatement",
            "object": ident("o"),
            "body": block(vec![
                decl("let", "w", Some(lit(1))),
                decl("var", "z", Some(lit(2))),
            ])
        }),
    ]);
    assert_eq!(root_binding(&ast, "w"), None);
    assert_eq!(root_binding(&ast, "z"), Some(Literal::Number(2.0)));
}

#[test]
fn string_doubling_stops_at_the_cap() {
    let capped = root_binding(&doubling(20, "="), "s");
    assert_eq!(
        capped.map(|lit| lit.to_js_string().len()),
        Some(MAX_STRING_LENGTH)
    );

    for operator in ["=", "+="] {
        let s = root_wrapper(&doubling(27, operator), "s").expect("s is bound");
        assert!(s.is_dirty(), "{operator}");
        assert_eq!(s.string_value(), None);
    }
}
