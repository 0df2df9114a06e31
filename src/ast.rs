//! Borrowed view over an ESTree-shaped JSON parse tree.
//!
//! The engine never owns the tree: an external parser produces JSON, and
//! [`JsNode`] gives typed access to it the way a tree-sitter `Node` would
//! (`kind()`, `child("field")`, `children("field")`).

use crate::diagnostics::Position;
use serde_json::Value;

macro_rules! node_kinds {
    ($($kind:ident),* $(,)?) => {
        /// ESTree node types the engine knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $($kind,)*
            /// Any `type` string outside the closed set above.
            Unknown,
        }

        impl NodeKind {
            pub fn from_type(ty: &str) -> Self {
                match ty {
                    $(stringify!($kind) => NodeKind::$kind,)*
                    _ => NodeKind::Unknown,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(NodeKind::$kind => stringify!($kind),)*
                    NodeKind::Unknown => "Unknown",
                }
            }
        }
    };
}

node_kinds! {
    Program,
    EmptyStatement,
    DebuggerStatement,
    ExpressionStatement,
    BlockStatement,
    StaticBlock,
    WithStatement,
    ReturnStatement,
    LabeledStatement,
    BreakStatement,
    ContinueStatement,
    IfStatement,
    SwitchStatement,
    SwitchCase,
    ThrowStatement,
    TryStatement,
    CatchClause,
    WhileStatement,
    DoWhileStatement,
    ForStatement,
    ForInStatement,
    ForOfStatement,
    FunctionDeclaration,
    VariableDeclaration,
    VariableDeclarator,
    ClassDeclaration,
    ClassExpression,
    ClassBody,
    MethodDefinition,
    PropertyDefinition,
    ThisExpression,
    Super,
    ArrayExpression,
    ObjectExpression,
    Property,
    FunctionExpression,
    ArrowFunctionExpression,
    SequenceExpression,
    UnaryExpression,
    BinaryExpression,
    AssignmentExpression,
    UpdateExpression,
    LogicalExpression,
    ConditionalExpression,
    NewExpression,
    CallExpression,
    MemberExpression,
    ChainExpression,
    Identifier,
    PrivateIdentifier,
    Literal,
    TemplateLiteral,
    TaggedTemplateExpression,
    TemplateElement,
    SpreadElement,
    YieldExpression,
    AwaitExpression,
    ImportExpression,
    MetaProperty,
    ObjectPattern,
    ArrayPattern,
    RestElement,
    AssignmentPattern,
    ImportDeclaration,
    ExportNamedDeclaration,
    ExportDefaultDeclaration,
    ExportAllDeclaration,
}

/// A node in an ESTree JSON document.
#[derive(Debug, Clone, Copy)]
pub struct JsNode<'a> {
    raw: &'a Value,
}

impl<'a> JsNode<'a> {
    /// Wrap a JSON value. Returns `None` for anything that is not a node object.
    pub fn new(raw: &'a Value) -> Option<Self> {
        raw.get("type")
            .and_then(Value::as_str)
            .map(|_| Self { raw })
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    pub fn type_name(&self) -> &'a str {
        self.raw.get("type").and_then(Value::as_str).unwrap_or("")
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::from_type(self.type_name())
    }

    /// Single node stored under `field`.
    pub fn child(&self, field: &str) -> Option<JsNode<'a>> {
        self.raw.get(field).and_then(JsNode::new)
    }

    /// Nodes stored under `field`, whether it holds one node or a list.
    /// Holes in array literals (`[1, , 2]`) are skipped.
    pub fn children(&self, field: &str) -> Vec<JsNode<'a>> {
        match self.raw.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(JsNode::new).collect(),
            Some(value) => JsNode::new(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// List field preserving holes as `None`.
    pub fn elements(&self, field: &str) -> Vec<Option<JsNode<'a>>> {
        match self.raw.get(field) {
            Some(Value::Array(items)) => items.iter().map(JsNode::new).collect(),
            _ => Vec::new(),
        }
    }

    pub fn str_field(&self, field: &str) -> Option<&'a str> {
        self.raw.get(field).and_then(Value::as_str)
    }

    pub fn bool_field(&self, field: &str) -> bool {
        self.raw.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn field(&self, field: &str) -> Option<&'a Value> {
        self.raw.get(field)
    }

    /// Identifier name, for `Identifier` and `PrivateIdentifier` nodes.
    pub fn identifier_name(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Identifier | NodeKind::PrivateIdentifier => self.str_field("name"),
            _ => None,
        }
    }

    /// Start position, from `loc.start` or top-level `line`/`column`.
    pub fn position(&self) -> Option<Position> {
        let read = |v: &Value| -> Option<Position> {
            let line = v.get("line")?.as_u64()?;
            let column = v.get("column").and_then(Value::as_u64).unwrap_or(0);
            Some(Position {
                line: line as usize,
                column: column as usize,
            })
        };
        self.raw
            .get("loc")
            .and_then(|loc| loc.get("start"))
            .and_then(read)
            .or_else(|| read(self.raw))
    }
}
