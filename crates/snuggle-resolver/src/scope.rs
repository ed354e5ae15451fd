//! Lexical scopes for resolution.

use rustc_hash::FxHashMap;

use crate::arena::DefId;

/// What a name means in the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEntry {
    /// A type definition.
    Type(DefId),
    /// The n-th type parameter of the enclosing type definition.
    TypeParam(usize),
    /// The n-th type parameter of the enclosing method.
    MethodParam(usize),
    /// A local binding: declaration, parameter, or `this`. Locals shadow
    /// type names in receiver position, which is how the resolver keeps
    /// the "local wins in expression position" rule.
    Local,
}

/// An immutable-feeling scope: extension clones the map.
///
/// Compiles are small enough that cloning a flat `FxHashMap` per block beats
/// threading a persistent structure through every recursive call.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: FxHashMap<String, ScopeEntry>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name, shadowing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, entry: ScopeEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Look up a name.
    pub fn lookup(&self, name: &str) -> Option<ScopeEntry> {
        self.entries.get(name).copied()
    }

    /// Whether the name resolves to a local binding.
    pub fn is_local(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(ScopeEntry::Local))
    }

    /// Whether the name resolves to a type (and is not shadowed by a local).
    pub fn type_of(&self, name: &str) -> Option<DefId> {
        match self.lookup(name) {
            Some(ScopeEntry::Type(id)) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_shadow_types() {
        let mut scope = Scope::new();
        scope.bind("x", ScopeEntry::Type(DefId(0)));
        assert_eq!(scope.type_of("x"), Some(DefId(0)));

        scope.bind("x", ScopeEntry::Local);
        assert!(scope.is_local("x"));
        assert_eq!(scope.type_of("x"), None);
    }

    #[test]
    fn clone_isolates_child_scopes() {
        let mut parent = Scope::new();
        parent.bind("T", ScopeEntry::Type(DefId(1)));
        let mut child = parent.clone();
        child.bind("x", ScopeEntry::Local);
        assert!(child.type_of("T").is_some());
        assert!(parent.lookup("x").is_none());
    }
}
