//! ESTree builders for integration tests.
//!
//! Each helper returns a `serde_json::Value` shaped like the output of a
//! standard ESTree parser, so tests can spell programs without a JS parser.
#![allow(dead_code)]

use serde_json::{Value, json};
use xpi_lint::{CompatContext, Diagnostic, Engine, Metadata};

pub fn program(body: Vec<Value>) -> Value {
    json!({"type": "Program", "sourceType": "script", "body": body})
}

pub fn expr(expression: Value) -> Value {
    json!({"type": "ExpressionStatement", "expression": expression})
}

pub fn ident(name: &str) -> Value {
    json!({"type": "Identifier", "name": name})
}

pub fn lit(value: impl Into<Value>) -> Value {
    json!({"type": "Literal", "value": value.into()})
}

pub fn member(object: Value, property: &str) -> Value {
    json!({
        "type": "MemberExpression",
        "object": object,
        "property": ident(property),
        "computed": false
    })
}

pub fn index(object: Value, property: Value) -> Value {
    json!({
        "type": "MemberExpression",
        "object": object,
        "property": property,
        "computed": true
    })
}

/// `a.b.c` from a dotted path.
pub fn path(dotted: &str) -> Value {
    let mut parts = dotted.split('.');
    let first = parts.next().unwrap_or_default();
    parts.fold(ident(first), member)
}

pub fn call(callee: Value, arguments: Vec<Value>) -> Value {
    json!({"type": "CallExpression", "callee": callee, "arguments": arguments})
}

pub fn assign(left: Value, right: Value) -> Value {
    json!({"type": "AssignmentExpression", "operator": "=", "left": left, "right": right})
}

pub fn binary(operator: &str, left: Value, right: Value) -> Value {
    json!({"type": "BinaryExpression", "operator": operator, "left": left, "right": right})
}

pub fn decl(kind: &str, name: &str, init: Option<Value>) -> Value {
    json!({
        "type": "VariableDeclaration",
        "kind": kind,
        "declarations": [{
            "type": "VariableDeclarator",
            "id": ident(name),
            "init": init
        }]
    })
}

pub fn block(body: Vec<Value>) -> Value {
    json!({"type": "BlockStatement", "body": body})
}

pub fn function(name: &str, params: &[&str], body: Vec<Value>) -> Value {
    let params: Vec<Value> = params.iter().map(|p| ident(p)).collect();
    json!({
        "type": "FunctionDeclaration",
        "id": ident(name),
        "params": params,
        "body": block(body)
    })
}

pub fn object(properties: Vec<(&str, Value)>) -> Value {
    let properties: Vec<Value> = properties
        .into_iter()
        .map(|(key, value)| {
            json!({
                "type": "Property",
                "key": ident(key),
                "value": value,
                "kind": "init",
                "computed": false
            })
        })
        .collect();
    json!({"type": "ObjectExpression", "properties": properties})
}

pub fn engine_with(metadata: &[(&str, Value)], compat: CompatContext) -> Engine {
    let mut meta = Metadata::new();
    for (key, value) in metadata {
        meta.set(*key, value.clone());
    }
    Engine::new().with_metadata(meta).with_compat(compat)
}

pub fn analyze_with(engine: &Engine, ast: &Value) -> Vec<Diagnostic> {
    engine
        .analyze_source(&ast.to_string())
        .expect("analysis should succeed")
        .into_diagnostics()
}

pub fn analyze(ast: &Value) -> Vec<Diagnostic> {
    analyze_with(&Engine::new(), ast)
}

/// Rendered identifiers (`javascript/dangerous_global/eval`) of every finding.
pub fn ids(diags: &[Diagnostic]) -> Vec<String> {
    diags.iter().map(|d| d.id.to_string()).collect()
}

pub fn count(diags: &[Diagnostic], id: &str) -> usize {
    diags.iter().filter(|d| d.id.to_string() == id).count()
}
