//! The typed AST: every sub-expression carries its `TypeId`.

use snuggle_common::Span;
use snuggle_ir::CallKind;
use snuggle_parser::ast::{FloatWidth, IntWidth};

use crate::method::MethodId;
use crate::ty::TypeId;

/// A typed source file: its top-level code as one body.
#[derive(Debug)]
pub struct TypedFile {
    pub name: String,
    pub body: TypedBody,
}

/// A typed method or top-level body with its local-slot requirement.
#[derive(Debug)]
pub struct TypedBody {
    pub expr: TypedExpr,
    /// One past the highest local slot the body uses; the lowerer's
    /// receiver-stash slot starts here.
    pub max_locals: u32,
}

/// A compile-time constant as the checker sees it. Lowering converts to the
/// erased IR constant; `IntLit` only survives until materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Int(IntWidth, i64),
    /// An integer literal that has not committed to a width yet.
    IntLit(i64),
    Float(FloatWidth, f64),
    Str(String),
}

#[derive(Debug)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: TypeId,
    pub span: Span,
}

/// Where a lambda capture's value comes from at the point the lambda is
/// constructed.
#[derive(Debug, Clone, Copy)]
pub enum CaptureSource {
    /// A local slot of the enclosing body.
    Local { index: u32, ty: TypeId },
    /// A capture field of the enclosing lambda.
    Capture { index: u32, ty: TypeId },
}

impl CaptureSource {
    pub fn ty(&self) -> TypeId {
        match self {
            CaptureSource::Local { ty, .. } | CaptureSource::Capture { ty, .. } => *ty,
        }
    }
}

/// One binding produced by a declaration pattern, with its local slot.
#[derive(Debug, Clone)]
pub struct BindingSlot {
    pub name: String,
    pub index: u32,
    pub ty: TypeId,
}

#[derive(Debug)]
pub enum TypedExprKind {
    Import(String),
    Literal(Constant),
    /// A local slot of the current body (parameters, `this`, declarations).
    Local { name: String, index: u32 },
    /// A capture field of the current lambda body.
    Capture { index: u32 },
    /// A static field read; enum variants carry a constant instead of a
    /// runtime field.
    StaticField { owner: TypeId, field: usize },
    /// An instance field read. `field` indexes the owner's field list; for
    /// classes the owner may be a supertype of the receiver's static type.
    Field {
        receiver: Box<TypedExpr>,
        owner: TypeId,
        field: usize,
    },
    /// Any method invocation. `receiver` is `None` for static calls.
    Call {
        call: CallKind,
        method: MethodId,
        receiver: Option<Box<TypedExpr>>,
        args: Vec<TypedExpr>,
    },
    /// `new C(...)`: allocate, then invoke the constructor specially.
    New { ctor: MethodId, args: Vec<TypedExpr> },
    /// Build a plural value from per-field values, in field order. Used for
    /// struct literals and tuples alike.
    RawStruct { values: Vec<TypedExpr> },
    /// Construct a lambda's implementation object, capturing the listed
    /// sources in order. The body lives on `impl_ty`'s `invoke` method.
    Lambda {
        impl_ty: TypeId,
        captures: Vec<CaptureSource>,
    },
    Declare {
        slots: Vec<BindingSlot>,
        value: Box<TypedExpr>,
    },
    /// `lhs` is a `Local`, `Field`, or `StaticField`.
    Assign {
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
    Return(Option<Box<TypedExpr>>),
    If {
        cond: Box<TypedExpr>,
        then: Box<TypedExpr>,
        els: Option<Box<TypedExpr>>,
    },
    While {
        cond: Box<TypedExpr>,
        body: Box<TypedExpr>,
    },
    Block(Vec<TypedExpr>),
}
