//! The definition arena: stable handles for type definitions.
//!
//! Type-defs in one block can reference each other in any order, so a name
//! binds to a [`DefId`] *before* the definition behind it exists. The arena
//! slot is the indirection: allocated empty, fulfilled exactly once, read
//! only after the resolution pass guarantees fulfillment.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use snuggle_common::Span;
use snuggle_parser::ast::{FloatWidth, IntWidth};

use crate::ast::{ResolvedField, ResolvedMethod, ResolvedType};

/// A stable index into the [`DefArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(pub u32);

/// A fully resolved type definition.
#[derive(Debug)]
pub enum ResolvedTypeDef {
    /// A compiler-provided type; the checker interprets the kind.
    Builtin(BuiltinKind),
    /// A bridged host class: index into the reflect registry.
    Reflected(usize),
    /// A source-defined class, struct, or enum.
    Snuggle(SnuggleTypeDef),
    /// A transparent alias for another type.
    Alias(ResolvedType),
}

/// The builtin type constructors the resolver installs before anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Object,
    Str,
    /// Generic over one reference type argument.
    OptionType,
    /// The `print` type; calling it invokes its static `invoke` overloads.
    Print,
    /// The compile-time type of unsuffixed integer literals. Never named in
    /// source; materializes to a concrete width on demand.
    IntLiteral,
}

/// A source-defined type definition after resolution.
#[derive(Debug)]
pub struct SnuggleTypeDef {
    pub name: String,
    /// The file this definition appeared in.
    pub file: String,
    pub is_pub: bool,
    pub type_params: Vec<String>,
    pub kind: SnuggleTypeDefKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum SnuggleTypeDefKind {
    Class {
        supertype: Option<ResolvedType>,
        fields: Vec<ResolvedField>,
        methods: Vec<Rc<ResolvedMethod>>,
    },
    Struct {
        fields: Vec<ResolvedField>,
        methods: Vec<Rc<ResolvedMethod>>,
    },
    Enum {
        variants: Vec<String>,
        methods: Vec<Rc<ResolvedMethod>>,
    },
}

/// Extension methods collected from `impl` blocks, keyed by target def.
/// The typer merges these into the target's method list when it specializes.
pub type ImplTable = FxHashMap<DefId, Vec<Rc<ResolvedMethod>>>;

/// The arena of type-def slots.
///
/// Each slot is a write-once cell: `alloc` creates it empty, `fulfill`
/// writes it, and a second `fulfill` of the same slot is a compiler bug
/// surfaced as an error, never silently ignored.
#[derive(Debug, Default)]
pub struct DefArena {
    slots: Vec<Option<Rc<ResolvedTypeDef>>>,
    names: Vec<String>,
}

impl DefArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an unfulfilled slot for a forward-declared definition.
    pub fn alloc(&mut self, name: impl Into<String>) -> DefId {
        let id = DefId(self.slots.len() as u32);
        self.slots.push(None);
        self.names.push(name.into());
        id
    }

    /// Allocate a slot that is fulfilled immediately (builtins, reflected
    /// classes).
    pub fn alloc_fulfilled(&mut self, name: impl Into<String>, def: ResolvedTypeDef) -> DefId {
        let id = self.alloc(name);
        self.slots[id.0 as usize] = Some(Rc::new(def));
        id
    }

    /// Fulfill a slot exactly once. Returns `false` if the slot was already
    /// fulfilled -- the caller reports that as an internal error.
    #[must_use]
    pub fn fulfill(&mut self, id: DefId, def: ResolvedTypeDef) -> bool {
        let slot = &mut self.slots[id.0 as usize];
        if slot.is_some() {
            return false;
        }
        *slot = Some(Rc::new(def));
        true
    }

    /// Read a slot; `None` means the indirection is not yet fulfilled.
    pub fn get(&self, id: DefId) -> Option<&Rc<ResolvedTypeDef>> {
        self.slots[id.0 as usize].as_ref()
    }

    /// The name the slot was allocated under (for diagnostics).
    pub fn name(&self, id: DefId) -> &str {
        &self.names[id.0 as usize]
    }

    /// Number of slots allocated so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids of slots that were never fulfilled. Empty after a successful
    /// resolution pass; anything else is a compiler bug.
    pub fn unfulfilled(&self) -> Vec<DefId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| DefId(i as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfill_is_write_once() {
        let mut arena = DefArena::new();
        let id = arena.alloc("A");
        assert!(arena.get(id).is_none());
        assert_eq!(arena.unfulfilled(), vec![id]);

        assert!(arena.fulfill(id, ResolvedTypeDef::Builtin(BuiltinKind::Bool)));
        assert!(arena.get(id).is_some());
        assert!(arena.unfulfilled().is_empty());

        // Second fulfillment is rejected, not overwritten.
        assert!(!arena.fulfill(id, ResolvedTypeDef::Builtin(BuiltinKind::Object)));
        assert!(matches!(
            arena.get(id).unwrap().as_ref(),
            ResolvedTypeDef::Builtin(BuiltinKind::Bool)
        ));
    }

    #[test]
    fn names_survive_for_diagnostics() {
        let mut arena = DefArena::new();
        let id = arena.alloc("Widget");
        assert_eq!(arena.name(id), "Widget");
    }
}
