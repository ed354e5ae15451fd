//! The resolved AST.
//!
//! Structurally close to the parsed AST, with two differences: every type
//! reference is a [`DefId`] handle (or a generic-parameter index), and
//! context-dependent forms are disambiguated -- static vs. virtual member
//! access, type-invoke vs. func-value calls, `super` only in its one legal
//! position.

use std::rc::Rc;

use snuggle_common::Span;
use snuggle_parser::ast::{FloatWidth, IntWidth};

use crate::arena::DefId;

/// A resolved type: the shape of a parsed type with names replaced by
/// arena handles and generic parameters replaced by their indices.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    /// A named definition applied to (possibly zero) type arguments.
    Def { id: DefId, args: Vec<ResolvedType> },
    /// The n-th type parameter of the enclosing type definition.
    TypeGeneric(usize),
    /// The n-th type parameter of the enclosing method.
    MethodGeneric(usize),
    Tuple(Vec<ResolvedType>),
    Func {
        params: Vec<ResolvedType>,
        ret: Box<ResolvedType>,
    },
}

impl ResolvedType {
    /// The unit type: the empty tuple.
    pub fn unit() -> Self {
        ResolvedType::Tuple(Vec::new())
    }

    /// A non-generic reference to a definition.
    pub fn def(id: DefId) -> Self {
        ResolvedType::Def { id, args: Vec::new() }
    }
}

/// A resolved field member.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub ty: ResolvedType,
    pub is_static: bool,
    pub span: Span,
}

/// A resolved method member. Bodies are shared via `Rc`: the typer's lazy
/// body entries keep the AST alive without cloning trees.
#[derive(Debug)]
pub struct ResolvedMethod {
    pub name: String,
    pub is_static: bool,
    pub type_params: Vec<String>,
    pub params: Vec<ResolvedPattern>,
    /// `None` means the unit type.
    pub ret: Option<ResolvedType>,
    pub body: Rc<ResolvedExpr>,
    pub span: Span,
}

/// A resolved declaration/parameter pattern.
#[derive(Debug, Clone)]
pub struct ResolvedPattern {
    pub kind: ResolvedPatternKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ResolvedPatternKind {
    Binding {
        name: String,
        ty: Option<ResolvedType>,
    },
    Tuple(Vec<ResolvedPattern>),
}

impl ResolvedPattern {
    /// The first name this pattern binds, for diagnostics.
    pub fn bound_name(&self) -> String {
        match &self.kind {
            ResolvedPatternKind::Binding { name, .. } => name.clone(),
            ResolvedPatternKind::Tuple(elems) => elems
                .first()
                .map(|p| p.bound_name())
                .unwrap_or_default(),
        }
    }
}

/// A resolved source file: its name and top-level expressions in order.
/// Type definitions have moved into the arena; imports remain as
/// expressions because they run at file top-level.
#[derive(Debug)]
pub struct ResolvedFile {
    pub name: String,
    pub exprs: Vec<ResolvedExpr>,
}

#[derive(Debug)]
pub struct ResolvedExpr {
    pub kind: ResolvedExprKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum ResolvedExprKind {
    Import(String),
    IntLiteral { value: i64, width: Option<IntWidth> },
    FloatLiteral { value: f64, width: Option<FloatWidth> },
    BoolLiteral(bool),
    StringLiteral(String),
    /// A local binding (includes `this` and parameters).
    Variable(String),
    FieldAccess {
        receiver: Box<ResolvedExpr>,
        name: String,
    },
    /// `Type.field` -- the receiver identifier named a type in scope and no
    /// local shadowed it.
    StaticFieldAccess {
        ty: ResolvedType,
        name: String,
    },
    MethodCall {
        receiver: Box<ResolvedExpr>,
        name: String,
        generics: Vec<ResolvedType>,
        args: Vec<ResolvedExpr>,
    },
    StaticMethodCall {
        ty: ResolvedType,
        name: String,
        generics: Vec<ResolvedType>,
        args: Vec<ResolvedExpr>,
    },
    /// `super.name(args)` inside a class method.
    SuperMethodCall {
        name: String,
        generics: Vec<ResolvedType>,
        args: Vec<ResolvedExpr>,
    },
    ConstructorCall {
        ty: ResolvedType,
        args: Vec<ResolvedExpr>,
    },
    RawStructConstructor {
        ty: ResolvedType,
        fields: Vec<(String, ResolvedExpr)>,
    },
    Tuple(Vec<ResolvedExpr>),
    Lambda {
        params: Vec<ResolvedPattern>,
        ret: Option<ResolvedType>,
        body: Rc<ResolvedExpr>,
    },
    Declaration {
        pattern: ResolvedPattern,
        value: Box<ResolvedExpr>,
    },
    Assignment {
        lhs: Box<ResolvedExpr>,
        rhs: Box<ResolvedExpr>,
    },
    Return(Option<Box<ResolvedExpr>>),
    If {
        cond: Box<ResolvedExpr>,
        then: Box<ResolvedExpr>,
        els: Option<Box<ResolvedExpr>>,
    },
    While {
        cond: Box<ResolvedExpr>,
        body: Box<ResolvedExpr>,
    },
    Block(Vec<ResolvedExpr>),
}
