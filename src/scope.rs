//! Lexical scope stack.
//!
//! The stack always holds the root (global) context; [`ScopeStack::pop`]
//! never removes it.

use crate::wrapper::Wrapper;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Blocks, `with` bodies, `catch` clauses.
    Block,
    /// Function bodies and the root.
    Function,
}

#[derive(Debug)]
pub struct Context {
    pub kind: ContextKind,
    bindings: BTreeMap<String, Wrapper>,
}

impl Context {
    fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            bindings: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Wrapper> {
        self.bindings.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

pub type ContextRef = Rc<RefCell<Context>>;

/// How a binding is introduced; decides which context receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Let,
    Var,
    Const,
    /// Assignment to an undeclared name.
    Glob,
}

#[derive(Debug, Clone)]
pub struct ScopeStack {
    contexts: Vec<ContextRef>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            contexts: vec![Rc::new(RefCell::new(Context::new(ContextKind::Function)))],
        }
    }

    pub fn push_block(&mut self) {
        self.push(ContextKind::Block);
    }

    pub fn push_function(&mut self) {
        self.push(ContextKind::Function);
    }

    fn push(&mut self, kind: ContextKind) {
        self.contexts.push(Rc::new(RefCell::new(Context::new(kind))));
    }

    /// Leave the innermost context. Ignored at the root.
    pub fn pop(&mut self) {
        if self.contexts.len() > 1 {
            self.contexts.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn root(&self) -> &ContextRef {
        &self.contexts[0]
    }

    /// Bind `name` according to the placement rule for `kind`.
    pub fn declare(&mut self, name: &str, value: Wrapper, kind: DeclKind) {
        let target = match kind {
            DeclKind::Let => self.contexts.last(),
            DeclKind::Var | DeclKind::Const => self
                .contexts
                .iter()
                .rev()
                .find(|ctx| ctx.borrow().kind == ContextKind::Function),
            DeclKind::Glob => self
                .contexts
                .iter()
                .rev()
                .find(|ctx| ctx.borrow().has(name))
                .or_else(|| self.contexts.first()),
        };
        if let Some(ctx) = target {
            ctx.borrow_mut().bindings.insert(name.to_string(), value);
        }
    }

    /// Innermost binding of `name`, if any context declares it.
    pub fn lookup(&self, name: &str) -> Option<Wrapper> {
        self.contexts
            .iter()
            .rev()
            .find_map(|ctx| ctx.borrow().get(name))
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.contexts.iter().any(|ctx| ctx.borrow().has(name))
    }

    /// Declared between the innermost context and the nearest function
    /// context, inclusive.
    pub fn is_declared_locally(&self, name: &str) -> bool {
        for ctx in self.contexts.iter().rev() {
            let ctx = ctx.borrow();
            if ctx.has(name) {
                return true;
            }
            if ctx.kind == ContextKind::Function {
                break;
            }
        }
        false
    }

    pub fn root_names(&self) -> Vec<String> {
        self.root().borrow().names().map(str::to_string).collect()
    }

    /// Shared handles to the current contexts. Deferred function bodies
    /// resume from a snapshot so later root bindings stay visible.
    pub fn snapshot(&self) -> Vec<ContextRef> {
        self.contexts.clone()
    }

    /// Install a snapshot, returning the contexts it replaced.
    pub fn replace(&mut self, contexts: Vec<ContextRef>) -> Vec<ContextRef> {
        if contexts.is_empty() {
            return self.contexts.clone();
        }
        std::mem::replace(&mut self.contexts, contexts)
    }
}
