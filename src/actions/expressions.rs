//! Expression handlers and literal propagation.

use crate::ast::{JsNode, NodeKind};
use crate::traverser::Traverser;
use crate::value::{JsObject, Literal, MAX_STRING_LENGTH};
use crate::wrapper::Wrapper;

/// Left-hand side of an assignment or update, evaluated once.
pub(crate) enum Target<'a> {
    Identifier(&'a str),
    Member(Wrapper, String),
    Pattern(JsNode<'a>),
    Unknown,
}

pub(crate) fn resolve_target<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Target<'a> {
    match node.kind() {
        NodeKind::Identifier => node
            .identifier_name()
            .map_or(Target::Unknown, Target::Identifier),
        NodeKind::MemberExpression => {
            let object = node
                .child("object")
                .map_or_else(Wrapper::dirty, |object| tr.traverse(object));
            match member_name(tr, node) {
                Some(name) => Target::Member(object, name),
                None => Target::Unknown,
            }
        }
        NodeKind::ObjectPattern | NodeKind::ArrayPattern => Target::Pattern(node),
        _ => {
            tr.traverse(node);
            Target::Unknown
        }
    }
}

fn read_target(tr: &mut Traverser<'_>, target: &Target<'_>) -> Wrapper {
    match target {
        Target::Identifier(name) => tr.resolve_identifier_quiet(name),
        Target::Member(object, name) => object.get(tr, name),
        Target::Pattern(_) | Target::Unknown => Wrapper::dirty(),
    }
}

pub(crate) fn write_target<'a>(tr: &mut Traverser<'a>, target: Target<'a>, value: Wrapper) {
    match target {
        Target::Identifier(name) => tr.assign_identifier(name, value),
        Target::Member(object, name) => object.set_property(tr, &name, value),
        Target::Pattern(pattern) => {
            super::declarations::bind_pattern(
                tr,
                pattern,
                value,
                super::declarations::BindMode::Assign,
            );
        }
        Target::Unknown => {}
    }
}

/// Property name of a member expression; computed keys use the propagated
/// literal (`window["ev" + "al"]`).
pub(crate) fn member_name<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Option<String> {
    let property = node.child("property")?;
    if node.bool_field("computed") {
        return tr
            .traverse(property)
            .literal_value()
            .map(|lit| lit.to_js_string());
    }
    match property.kind() {
        NodeKind::PrivateIdentifier => property.str_field("name").map(|n| format!("#{n}")),
        _ => property.identifier_name().map(str::to_string),
    }
}

/// Key of an object-literal or object-pattern property.
pub(crate) fn property_key<'a>(tr: &mut Traverser<'a>, prop: JsNode<'a>) -> Option<String> {
    let key = prop.child("key")?;
    if prop.bool_field("computed") {
        return tr.traverse(key).literal_value().map(|lit| lit.to_js_string());
    }
    match key.kind() {
        NodeKind::Identifier => key.identifier_name().map(str::to_string),
        NodeKind::Literal => Some(Literal::from_estree(key.raw()).to_js_string()),
        NodeKind::PrivateIdentifier => key.str_field("name").map(|n| format!("#{n}")),
        _ => None,
    }
}

fn literal_or_dirty(lit: Option<Literal>) -> Wrapper {
    lit.map_or_else(Wrapper::dirty, Wrapper::literal)
}

fn traverse_field<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>, field: &str) -> Wrapper {
    node.child(field)
        .map_or_else(Wrapper::dirty, |child| tr.traverse(child))
}

pub(super) fn identifier<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    match node.identifier_name() {
        Some(name) => tr.resolve_identifier(name),
        None => Wrapper::dirty(),
    }
}

pub(super) fn literal<'a>(_tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    Wrapper::literal(Literal::from_estree(node.raw()))
}

pub(super) fn this_expression<'a>(tr: &mut Traverser<'a>, _node: JsNode<'a>) -> Wrapper {
    tr.this_value()
}

pub(super) fn unknown<'a>(_tr: &mut Traverser<'a>, _node: JsNode<'a>) -> Wrapper {
    Wrapper::dirty()
}

/// Spread, `yield`, `await`: visit the operand, value unknown.
pub(super) fn opaque_argument<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    traverse_field(tr, node, "argument");
    Wrapper::dirty()
}

pub(super) fn chain<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    traverse_field(tr, node, "expression")
}

pub(super) fn array<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let mut spread = false;
    let mut elements = Vec::new();
    for element in node.elements("elements") {
        let Some(element) = element else {
            elements.push(None);
            continue;
        };
        let value = tr.traverse(element);
        if element.kind() == NodeKind::SpreadElement {
            spread = true;
            continue;
        }
        elements.push(Some(Wrapper::copy_of(&value)));
    }
    let array = Wrapper::array(elements);
    if spread {
        array.mark_dirty();
    }
    array
}

pub(super) fn object<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let object = JsObject::new();
    for prop in node.children("properties") {
        if prop.kind() != NodeKind::Property {
            tr.traverse(prop);
            continue;
        }
        let key = property_key(tr, prop);
        let value = traverse_field(tr, prop, "value");
        let value = match prop.str_field("kind") {
            Some("get") | Some("set") => Wrapper::dirty(),
            _ => value,
        };
        if let Some(key) = key {
            object.insert(key, Wrapper::copy_of(&value));
        }
    }
    Wrapper::from_object(object)
}

pub(super) fn template<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let quasis = node.children("quasis");
    let expressions: Vec<Wrapper> = node
        .children("expressions")
        .into_iter()
        .map(|expr| tr.traverse(expr))
        .collect();

    let mut out = String::new();
    for (index, quasi) in quasis.iter().enumerate() {
        let cooked = quasi
            .field("value")
            .and_then(|v| v.get("cooked"))
            .and_then(|v| v.as_str());
        let Some(cooked) = cooked else {
            return Wrapper::dirty();
        };
        out.push_str(cooked);
        if let Some(expr) = expressions.get(index) {
            let Some(lit) = expr.literal_value() else {
                return Wrapper::dirty();
            };
            out.push_str(&lit.to_js_string());
        }
        if out.len() > MAX_STRING_LENGTH {
            return Wrapper::dirty();
        }
    }
    Wrapper::literal(out)
}

pub(super) fn sequence<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let mut last = Wrapper::dirty();
    for expr in node.children("expressions") {
        last = tr.traverse(expr);
    }
    last
}

pub(super) fn member<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let object = traverse_field(tr, node, "object");
    match member_name(tr, node) {
        Some(name) => object.get(tr, &name),
        None => Wrapper::dirty(),
    }
}

pub(super) fn unary<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let operator = node.str_field("operator").unwrap_or("");
    let argument = traverse_field(tr, node, "argument");
    match operator {
        "typeof" => argument
            .type_of()
            .map_or_else(Wrapper::dirty, Wrapper::literal),
        "void" => Wrapper::undefined(),
        "delete" => Wrapper::literal(true),
        op => literal_or_dirty(argument.literal_value().and_then(|lit| lit.unary(op))),
    }
}

/// Fold a binary operator over two wrappers.
fn fold_binary(operator: &str, left: &Wrapper, right: &Wrapper) -> Wrapper {
    match operator {
        "in" => {
            let found = left
                .literal_value()
                .and_then(|key| right.contains(&key));
            literal_or_dirty(found.map(Literal::Bool))
        }
        "instanceof" => Wrapper::dirty(),
        "==" | "!=" | "===" | "!==" if !(left.is_literal() && right.is_literal()) => {
            Wrapper::dirty()
        }
        op => match (left.literal_value(), right.literal_value()) {
            (Some(l), Some(r)) => literal_or_dirty(l.binary(op, &r)),
            _ => Wrapper::dirty(),
        },
    }
}

pub(super) fn binary<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let left = traverse_field(tr, node, "left");
    let right = traverse_field(tr, node, "right");
    fold_binary(node.str_field("operator").unwrap_or(""), &left, &right)
}

/// `&&`, `||`, `??` given both operands; unknown unless the left side
/// decides.
fn fold_logical(operator: &str, left: Wrapper, right: Wrapper) -> Wrapper {
    let Some(lit) = left.literal_value() else {
        return Wrapper::dirty();
    };
    let take_left = match operator {
        "&&" => !lit.truthy(),
        "||" => lit.truthy(),
        "??" => !matches!(lit, Literal::Undefined | Literal::Null),
        _ => return Wrapper::dirty(),
    };
    if take_left { left } else { right }
}

pub(super) fn logical<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let left = traverse_field(tr, node, "left");
    let right = traverse_field(tr, node, "right");
    fold_logical(node.str_field("operator").unwrap_or(""), left, right)
}

pub(super) fn conditional<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let test = traverse_field(tr, node, "test");
    let consequent = traverse_field(tr, node, "consequent");
    let alternate = traverse_field(tr, node, "alternate");
    match test.literal_value() {
        Some(lit) if lit.truthy() => consequent,
        Some(_) => alternate,
        None => Wrapper::dirty(),
    }
}

pub(super) fn assignment<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let operator = node.str_field("operator").unwrap_or("=");
    let target = match node.child("left") {
        Some(left) => resolve_target(tr, left),
        None => Target::Unknown,
    };
    let rhs = traverse_field(tr, node, "right");

    let value = match operator.strip_suffix('=') {
        Some("") | None => rhs,
        Some(op @ ("&&" | "||" | "??")) => {
            let current = read_target(tr, &target);
            fold_logical(op, current, rhs)
        }
        Some(op) => {
            let current = read_target(tr, &target);
            fold_binary(op, &current, &rhs)
        }
    };
    write_target(tr, target, value.clone());
    value
}

pub(super) fn update<'a>(tr: &mut Traverser<'a>, node: JsNode<'a>) -> Wrapper {
    let Some(argument) = node.child("argument") else {
        return Wrapper::dirty();
    };
    let target = resolve_target(tr, argument);
    let current = read_target(tr, &target);
    let Some(old) = current.literal_value().map(|lit| lit.to_number()) else {
        write_target(tr, target, Wrapper::dirty());
        return Wrapper::dirty();
    };
    let delta = if node.str_field("operator") == Some("--") { -1.0 } else { 1.0 };
    let new = old + delta;
    write_target(tr, target, Wrapper::literal(new));
    Wrapper::literal(if node.bool_field("prefix") { new } else { old })
}
