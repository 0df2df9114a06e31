//! Statements that introduce bindings: declarations, functions, classes,
//! loops with heads, `catch`, `with`, and module syntax.

use crate::ast::{JsNode, NodeKind};
use crate::scope::DeclKind;
use crate::traverser::Traverser;
use crate::value::Literal;
use crate::wrapper::Wrapper;

/// Where a pattern's names go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    Declare(DeclKind),
    Assign,
}

/// Bind every name in `pattern` from `value`, destructuring where the
/// value is known.
pub(crate) fn bind_pattern<'a>(
    tr: &mut Traverser<'a>,
    pattern: JsNode<'a>,
    value: Wrapper,
    mode: BindMode,
) {
    match pattern.kind() {
        NodeKind::Identifier => {
            let Some(name) = pattern.identifier_name() else {
                return;
            };
            match mode {
                BindMode::Declare(kind) => declare(tr, name, value, kind),
                BindMode::Assign => tr.assign_identifier(name, value),
            }
        }
        NodeKind::MemberExpression if mode == BindMode::Assign => {
            let target = super::expressions::resolve_target(tr, pattern);
            super::expressions::write_target(tr, target, value);
        }
        NodeKind::ObjectPattern => {
            for prop in pattern.children("properties") {
                if prop.kind() == NodeKind::RestElement {
                    if let Some(arg) = prop.child("argument") {
                        bind_pattern(tr, arg, Wrapper::dirty(), mode);
                    }
                    continue;
                }
                let member = match super::expressions::property_key(tr, prop) {
                    Some(key) => value.get(tr, &key),
                    None => Wrapper::dirty(),
                };
                if let Some(target) = prop.child("value") {
                    bind_pattern(tr, target, member, mode);
                }
            }
        }
        NodeKind::ArrayPattern => {
            for (index, element) in pattern.elements("elements").into_iter().enumerate() {
                let Some(element) = element else {
                    continue;
                };
                if element.kind() == NodeKind::RestElement {
                    if let Some(arg) = element.child("argument") {
                        bind_pattern(tr, arg, Wrapper::dirty(), mode);
                    }
                    continue;
                }
                let member = value.get(tr, &index.to_string());
                bind_pattern(tr, element, member, mode);
            }
        }
        NodeKind::AssignmentPattern => {
            let fallback = pattern.child("right").map(|right| tr.traverse(right));
            let value = match (value.literal_value(), fallback) {
                (Some(Literal::Undefined), Some(fallback)) => fallback,
                _ => value,
            };
            if let Some(left) = pattern.child("left") {
                bind_pattern(tr, left, value, mode);
            }
        }
        NodeKind::RestElement => {
            if let Some(arg) = pattern.child("argument") {
                bind_pattern(tr, arg, Wrapper::dirty(), mode);
            }
        }
        _ => {
            tr.traverse(pattern);
        }
    }
}

fn declare(tr: &mut Traverser<'_>, name: &str, value: Wrapper, kind: DeclKind) {
    if tr.catalog().banned_identifier(name) {
        tr.assign_identifier(name, value);
        return;
    }
    let slot = Wrapper::copy_of(&value);
    if kind == DeclKind::Const {
        slot.mark_const();
    }
    tr.scopes_mut().declare(name, slot, kind);
}

/// Bind a function name to a callable, reusing a hoisted binding.
fn declare_function(tr: &mut Traverser<'_>, name: &str) {
    let hoisted = tr.scopes().is_declared_locally(name)
        && tr.scopes().lookup(name).is_some_and(|w| w.is_callable());
    if !hoisted {
        declare(tr, name, Wrapper::function(), DeclKind::Var);
    }
}

/// Statement list with function declarations hoisted.
fn statements<'a>(tr: &mut Traverser<'a>, body: Vec<JsNode<'a>>) {
    for stmt in &body {
        if stmt.kind() == NodeKind::FunctionDeclaration
            && let Some(name) = stmt.child("id").and_then(|id| id.identifier_name())
        {
            declare_function(tr, name);
        }
    }
    for stmt in body {
        tr.traverse(stmt);
    }
}

pub(super) fn program<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    statements(tr, node.children("body"));
    Wrapper::dirty()
}

pub(super) fn variable_declaration<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let kind = match node.str_field("kind") {
        Some("const") => DeclKind::Const,
        Some("let") | Some("using") | Some("await using") => DeclKind::Let,
        _ => DeclKind::Var,
    };
    for declarator in node.children("declarations") {
        let Some(id) = declarator.child("id") else {
            continue;
        };
        let value = match declarator.child("init") {
            Some(init) => tr.traverse(init),
            None => {
                // `var x;` keeps an existing binding.
                let redeclared = kind == DeclKind::Var
                    && id
                        .identifier_name()
                        .is_some_and(|name| tr.scopes().is_declared_locally(name));
                if redeclared {
                    continue;
                }
                Wrapper::undefined()
            }
        };
        bind_pattern(tr, id, value, BindMode::Declare(kind));
    }
    Wrapper::dirty()
}

pub(super) fn function_declaration<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    if let Some(name) = node.child("id").and_then(|id| id.identifier_name()) {
        declare_function(tr, name);
    }
    tr.defer_function(node);
    Wrapper::dirty()
}

pub(super) fn function_expression<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    tr.defer_function(node);
    Wrapper::function()
}

/// Analyze a deferred function: parameters become fresh unknowns in a new
/// function context.
pub(crate) fn function_body<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) {
    tr.scopes_mut().push_function();

    if node.kind() == NodeKind::FunctionExpression
        && let Some(name) = node.child("id").and_then(|id| id.identifier_name())
    {
        declare(tr, name, Wrapper::function(), DeclKind::Var);
    }
    for param in node.children("params") {
        bind_pattern(tr, param, Wrapper::dirty(), BindMode::Declare(DeclKind::Var));
    }

    match node.child("body") {
        Some(body) if body.kind() == NodeKind::BlockStatement => {
            statements(tr, body.children("body"));
        }
        Some(expression) => {
            tr.traverse(expression);
        }
        None => {}
    }

    tr.scopes_mut().pop();
}

pub(super) fn class<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let class = Wrapper::function();
    if let Some(superclass) = node.child("superClass") {
        tr.traverse(superclass);
    }
    if node.kind() == NodeKind::ClassDeclaration
        && let Some(name) = node.child("id").and_then(|id| id.identifier_name())
    {
        declare(tr, name, class.clone(), DeclKind::Let);
    }
    if let Some(body) = node.child("body") {
        tr.traverse(body);
    }
    class
}

pub(super) fn class_member<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    if node.bool_field("computed")
        && let Some(key) = node.child("key")
    {
        tr.traverse(key);
    }
    if let Some(value) = node.child("value") {
        tr.traverse(value);
    }
    Wrapper::dirty()
}

pub(super) fn catch_clause<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    if let Some(param) = node.child("param") {
        bind_pattern(tr, param, Wrapper::dirty(), BindMode::Declare(DeclKind::Let));
    }
    if let Some(body) = node.child("body") {
        tr.traverse(body);
    }
    Wrapper::dirty()
}

/// `for (x in y)` / `for (x of y)`: the loop variable is unknown.
pub(super) fn for_in<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    if let Some(right) = node.child("right") {
        tr.traverse(right);
    }
    if let Some(left) = node.child("left") {
        if left.kind() == NodeKind::VariableDeclaration {
            let kind = match left.str_field("kind") {
                Some("const") => DeclKind::Const,
                Some("let") => DeclKind::Let,
                _ => DeclKind::Var,
            };
            for declarator in left.children("declarations") {
                if let Some(id) = declarator.child("id") {
                    bind_pattern(tr, id, Wrapper::dirty(), BindMode::Declare(kind));
                }
            }
        } else {
            bind_pattern(tr, left, Wrapper::dirty(), BindMode::Assign);
        }
    }
    if let Some(body) = node.child("body") {
        tr.traverse(body);
    }
    Wrapper::dirty()
}

pub(super) fn with_statement<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    if let Some(object) = node.child("object") {
        tr.traverse(object);
    }
    if let Some(body) = node.child("body") {
        tr.traverse(body);
    }
    Wrapper::dirty()
}

pub(super) fn import_declaration<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    tr.mark_module();
    for specifier in node.children("specifiers") {
        if let Some(local) = specifier.child("local").and_then(|l| l.identifier_name()) {
            declare(tr, local, Wrapper::dirty(), DeclKind::Let);
        }
    }
    Wrapper::dirty()
}

pub(super) fn export_declaration<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    tr.mark_module();
    if let Some(declaration) = node.child("declaration") {
        if declaration.kind() == NodeKind::FunctionDeclaration
            && let Some(name) = declaration.child("id").and_then(|id| id.identifier_name())
        {
            declare_function(tr, name);
        }
        tr.traverse(declaration);
    }
    Wrapper::dirty()
}

pub(super) fn export_all<'a>(tr: &mut Traverser<'a>, _node: JsNode<'a>) -> Wrapper {
    tr.mark_module();
    Wrapper::dirty()
}
