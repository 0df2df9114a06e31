//! Per-node-kind dispatch table.
//!
//! Every [`NodeKind`] maps to a [`NodeSpec`]: which child fields to recurse
//! into, whether the node opens a scope, and an optional handler whose result
//! becomes the node's value. Kinds with a handler do not recurse on their
//! own; the handler decides which children to visit.

mod calls;
mod declarations;
mod expressions;

use crate::ast::{JsNode, NodeKind};
use crate::traverser::Traverser;
use crate::wrapper::Wrapper;

pub(crate) use declarations::function_body;

pub type Action = for<'a> fn(&mut Traverser<'a>, JsNode<'a>) -> Wrapper;

#[derive(Clone, Copy)]
pub struct NodeSpec {
    pub branches: &'static [&'static str],
    /// Pushes a function context around the node.
    pub establishes_context: bool,
    pub action: Option<Action>,
    pub returns_value: bool,
    /// Pushes a block context around the node.
    pub block_level: bool,
}

const fn walk(branches: &'static [&'static str]) -> NodeSpec {
    NodeSpec {
        branches,
        establishes_context: false,
        action: None,
        returns_value: false,
        block_level: false,
    }
}

const fn block(branches: &'static [&'static str]) -> NodeSpec {
    let mut spec = walk(branches);
    spec.block_level = true;
    spec
}

const fn act(action: Action) -> NodeSpec {
    let mut spec = walk(&[]);
    spec.action = Some(action);
    spec.returns_value = true;
    spec
}

const fn act_block(action: Action) -> NodeSpec {
    let mut spec = act(action);
    spec.block_level = true;
    spec
}

/// Statement handler: run for effect, value is discarded.
const fn stmt(action: Action) -> NodeSpec {
    let mut spec = act(action);
    spec.returns_value = false;
    spec
}

pub fn node_spec(kind: NodeKind) -> NodeSpec {
    use NodeKind::*;
    use calls as c;
    use declarations as d;
    use expressions as e;

    match kind {
        Program => stmt(d::program),
        EmptyStatement | DebuggerStatement | BreakStatement | ContinueStatement => walk(&[]),
        ExpressionStatement => walk(&["expression"]),
        BlockStatement => block(&["body"]),
        StaticBlock => NodeSpec {
            establishes_context: true,
            ..walk(&["body"])
        },
        WithStatement => act_block(d::with_statement),
        ReturnStatement | ThrowStatement => walk(&["argument"]),
        LabeledStatement => walk(&["body"]),
        IfStatement => walk(&["test", "consequent", "alternate"]),
        SwitchStatement => block(&["discriminant", "cases"]),
        SwitchCase => walk(&["test", "consequent"]),
        TryStatement => walk(&["block", "handler", "finalizer"]),
        CatchClause => act_block(d::catch_clause),
        WhileStatement => walk(&["test", "body"]),
        DoWhileStatement => walk(&["body", "test"]),
        ForStatement => block(&["init", "test", "update", "body"]),
        ForInStatement | ForOfStatement => act_block(d::for_in),
        FunctionDeclaration => stmt(d::function_declaration),
        VariableDeclaration => stmt(d::variable_declaration),
        VariableDeclarator => walk(&["init"]),
        ClassDeclaration | ClassExpression => act(d::class),
        ClassBody => walk(&["body"]),
        MethodDefinition | PropertyDefinition => stmt(d::class_member),
        ThisExpression => act(e::this_expression),
        Super | PrivateIdentifier | MetaProperty => act(e::unknown),
        ArrayExpression => act(e::array),
        ObjectExpression => act(e::object),
        Property => walk(&["value"]),
        FunctionExpression | ArrowFunctionExpression => act(d::function_expression),
        SequenceExpression => act(e::sequence),
        UnaryExpression => act(e::unary),
        BinaryExpression => act(e::binary),
        AssignmentExpression => act(e::assignment),
        UpdateExpression => act(e::update),
        LogicalExpression => act(e::logical),
        ConditionalExpression => act(e::conditional),
        NewExpression | CallExpression => act(c::call),
        MemberExpression => act(e::member),
        ChainExpression => act(e::chain),
        Identifier => act(e::identifier),
        Literal => act(e::literal),
        TemplateLiteral => act(e::template),
        TaggedTemplateExpression => act(c::tagged_template),
        TemplateElement => walk(&[]),
        SpreadElement | YieldExpression | AwaitExpression => act(e::opaque_argument),
        ImportExpression => act(c::dynamic_import),
        ObjectPattern | ArrayPattern | RestElement | AssignmentPattern => walk(&[]),
        ImportDeclaration => stmt(d::import_declaration),
        ExportNamedDeclaration | ExportDefaultDeclaration => stmt(d::export_declaration),
        ExportAllDeclaration => stmt(d::export_all),
        Unknown => walk(&[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_level_kinds_push_scopes() {
        for kind in [
            NodeKind::BlockStatement,
            NodeKind::ForStatement,
            NodeKind::ForInStatement,
            NodeKind::CatchClause,
            NodeKind::SwitchStatement,
            NodeKind::WithStatement,
        ] {
            assert!(node_spec(kind).block_level, "{kind:?}");
        }
        assert!(node_spec(NodeKind::StaticBlock).establishes_context);
    }

    #[test]
    fn unknown_kinds_do_nothing() {
        let spec = node_spec(NodeKind::Unknown);
        assert!(spec.branches.is_empty());
        assert!(spec.action.is_none());
        assert!(!spec.returns_value);
    }

    #[test]
    fn expressions_produce_values() {
        assert!(node_spec(NodeKind::BinaryExpression).returns_value);
        assert!(node_spec(NodeKind::CallExpression).returns_value);
        assert!(!node_spec(NodeKind::VariableDeclaration).returns_value);
    }
}
