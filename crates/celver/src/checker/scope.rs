//! Variable scopes for checking.
//!
//! The root scope holds the environment's declared variables; comprehensions
//! push local scopes whose iteration and accumulator variables shadow it.

use std::collections::HashMap;

use crate::types::{CelType, VariableDecl};

#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, VariableDecl>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, cel_type: CelType) {
        let name = name.into();
        self.variables
            .insert(name.clone(), VariableDecl::new(name, cel_type));
    }

    pub fn get(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.get(name)
    }
}

/// Where a name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    /// A declared environment variable.
    Declared(&'a VariableDecl),
    /// A comprehension-local variable.
    Local(&'a VariableDecl),
}

impl<'a> Binding<'a> {
    pub fn decl(self) -> &'a VariableDecl {
        match self {
            Binding::Declared(decl) | Binding::Local(decl) => decl,
        }
    }
}

#[derive(Debug)]
pub struct ScopeStack<'a> {
    root: &'a HashMap<String, VariableDecl>,
    /// Innermost scope last.
    locals: Vec<Scope>,
}

impl<'a> ScopeStack<'a> {
    pub fn new(root: &'a HashMap<String, VariableDecl>) -> Self {
        Self {
            root,
            locals: Vec::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.locals.push(Scope::new());
    }

    pub fn exit_scope(&mut self) -> Option<Scope> {
        self.locals.pop()
    }

    /// Add a variable to the innermost local scope, opening one if needed.
    pub fn add_variable(&mut self, name: impl Into<String>, cel_type: CelType) {
        if self.locals.is_empty() {
            self.enter_scope();
        }
        if let Some(scope) = self.locals.last_mut() {
            scope.add_variable(name, cel_type);
        }
    }

    /// Look up a name from the innermost scope outward.
    pub fn resolve(&self, name: &str) -> Option<Binding<'_>> {
        self.locals
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(Binding::Local)
            .or_else(|| self.root.get(name).map(Binding::Declared))
    }

    pub fn depth(&self) -> usize {
        self.locals.len()
    }
}
