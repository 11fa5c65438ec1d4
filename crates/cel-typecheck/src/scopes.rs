//! Lexical scopes for identifier and function resolution.
//!
//! Scopes form a singly linked chain, innermost first. Pushing a scope
//! shares the outer chain instead of copying it, so each environment can
//! hold its own chain without affecting the one it was derived from.

use std::collections::HashMap;
use std::sync::Arc;

use cel_typecheck_common::{FunctionDecl, IdentDecl};

/// The declarations of one lexical level.
///
/// Identifiers and functions live in separate namespaces.
#[derive(Debug, Clone, Default)]
pub struct Group {
    idents: HashMap<String, IdentDecl>,
    functions: HashMap<String, FunctionDecl>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ident(&self, name: &str) -> Option<&IdentDecl> {
        self.idents.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }
}

/// A chain of `Group`s, innermost first.
#[derive(Debug, Clone, Default)]
pub struct Scopes {
    scope: Group,
    parent: Option<Arc<Scopes>>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new chain with an empty innermost group nested inside `outer`.
    pub fn push(outer: &Arc<Scopes>) -> Scopes {
        Scopes {
            scope: Group::new(),
            parent: Some(Arc::clone(outer)),
        }
    }

    /// The enclosing chain, or None at the outermost scope.
    pub fn pop(&self) -> Option<&Arc<Scopes>> {
        self.parent.as_ref()
    }

    /// Number of groups in the chain.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    /// Add or replace an identifier in the innermost group.
    pub fn add_ident(&mut self, decl: IdentDecl) {
        self.scope.idents.insert(decl.name.clone(), decl);
    }

    /// Add or replace a function in the innermost group.
    pub fn set_function(&mut self, decl: FunctionDecl) {
        self.scope.functions.insert(decl.name.clone(), decl);
    }

    /// Look up an identifier, searching from innermost to outermost scope.
    pub fn find_ident(&self, name: &str) -> Option<&IdentDecl> {
        self.scope
            .ident(name)
            .or_else(|| self.parent.as_ref()?.find_ident(name))
    }

    /// Look up an identifier in the innermost scope only.
    pub fn find_ident_in_scope(&self, name: &str) -> Option<&IdentDecl> {
        self.scope.ident(name)
    }

    /// Look up a function, searching from innermost to outermost scope.
    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.scope
            .function(name)
            .or_else(|| self.parent.as_ref()?.find_function(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_typecheck_common::CelType;

    #[test]
    fn test_add_and_find_ident() {
        let mut scopes = Scopes::new();
        scopes.add_ident(IdentDecl::new("x", CelType::Int));

        let decl = scopes.find_ident("x").unwrap();
        assert_eq!(decl.cel_type, CelType::Int);
        assert!(scopes.find_ident("y").is_none());
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut outer = Scopes::new();
        outer.add_ident(IdentDecl::new("x", CelType::Int));
        outer.add_ident(IdentDecl::new("y", CelType::Bool));
        let outer = Arc::new(outer);

        let mut inner = Scopes::push(&outer);
        inner.add_ident(IdentDecl::new("x", CelType::String));

        assert_eq!(inner.find_ident("x").unwrap().cel_type, CelType::String);
        assert_eq!(inner.find_ident("y").unwrap().cel_type, CelType::Bool);
        assert!(inner.find_ident_in_scope("y").is_none());
        assert_eq!(outer.find_ident("x").unwrap().cel_type, CelType::Int);
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn test_pop_returns_parent() {
        let outer = Arc::new(Scopes::new());
        let inner = Scopes::push(&outer);
        assert!(Arc::ptr_eq(inner.pop().unwrap(), &outer));
        assert!(outer.pop().is_none());
    }

    #[test]
    fn test_functions_are_separate_namespace() {
        let mut scopes = Scopes::new();
        scopes.set_function(FunctionDecl::new("f"));
        assert!(scopes.find_function("f").is_some());
        assert!(scopes.find_ident("f").is_none());

        let inner = Scopes::push(&Arc::new(scopes));
        assert!(inner.find_function("f").is_some());
    }
}
