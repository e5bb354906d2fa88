//! Lexical scopes for locally bound names

use rela_types::Type;
use std::collections::HashMap;

/// Names bound by parameters, `let` and quantifiers
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Names defined in this scope
    names: HashMap<String, Type>,
    /// Enclosing scope
    parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_parent(parent: Scope) -> Self {
        Self {
            names: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    pub fn define(&mut self, name: impl Into<String>, ty: Type) {
        self.names.insert(name.into(), ty);
    }

    /// Innermost binding of `name`
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        match self.names.get(name) {
            Some(ty) => Some(ty),
            None => self.parent.as_ref().and_then(|p| p.lookup(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn push(&mut self) {
        let old = std::mem::take(self);
        *self = Scope::with_parent(old);
    }

    pub fn pop(&mut self) {
        if let Some(parent) = self.parent.take() {
            *self = *parent;
        }
    }

    /// Nesting depth; zero for the outermost scope
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }
}
