//! Calls, `new`, tagged templates and dynamic `import()`.

use super::expressions::member_name;
use crate::ast::{JsNode, NodeKind};
use crate::traverser::Traverser;
use crate::wrapper::Wrapper;

/// Evaluate a callee, keeping the receiver for method-call hooks.
fn callee<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> (Wrapper, Option<(Wrapper, String)>) {
    let node = match node.kind() {
        NodeKind::ChainExpression => match node.child("expression") {
            Some(inner) => inner,
            None => return (Wrapper::dirty(), None),
        },
        _ => node,
    };
    if node.kind() != NodeKind::MemberExpression {
        return (tr.traverse(node), None);
    }
    let receiver = node
        .child("object")
        .map_or_else(Wrapper::dirty, |object| tr.traverse(object));
    match member_name(tr, node) {
        Some(name) => {
            let function = receiver.get(tr, &name);
            (function, Some((receiver, name)))
        }
        None => (Wrapper::dirty(), None),
    }
}

/// `CallExpression` and `NewExpression`.
pub(super) fn call<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let (function, method) = match node.child("callee") {
        Some(callee_node) => callee(tr, callee_node),
        None => (Wrapper::dirty(), None),
    };
    let args: Vec<Wrapper> = node
        .children("arguments")
        .into_iter()
        .map(|arg| tr.traverse(arg))
        .collect();
    tr.invoke(&function, method, args)
}

pub(super) fn tagged_template<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let (function, method) = match node.child("tag") {
        Some(tag) => callee(tr, tag),
        None => (Wrapper::dirty(), None),
    };
    let mut args = vec![Wrapper::dirty()];
    if let Some(quasi) = node.child("quasi") {
        for expr in quasi.children("expressions") {
            args.push(tr.traverse(expr));
        }
    }
    tr.invoke(&function, method, args)
}

pub(super) fn dynamic_import<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    if let Some(source) = node.child("source") {
        tr.traverse(source);
    }
    Wrapper::dirty()
}
