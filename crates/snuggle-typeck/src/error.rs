//! Typing errors.
//!
//! Types appear here as display strings rather than `TypeId`s so that an
//! error can outlive the checker that produced it.

use std::fmt;

use snuggle_common::{Diagnostic, Phase, Span};

/// A typing error. Type checking is fail-fast.
#[derive(Debug)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
    pub file: String,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span, file: impl Into<String>) -> Self {
        Self { kind, span, file: file.into() }
    }

    /// Convert into the driver-facing diagnostic shape.
    pub fn into_diagnostic(self) -> Diagnostic {
        match &self.kind {
            TypeErrorKind::Internal(_) => {
                Diagnostic::internal(Phase::Typing, self.kind.to_string(), self.span, self.file)
            }
            _ => Diagnostic::new(Phase::Typing, self.kind.to_string(), self.span, self.file),
        }
    }
}

#[derive(Debug)]
pub enum TypeErrorKind {
    /// Two types that should line up do not.
    Mismatch { expected: String, found: String },
    /// Wrong number of value arguments.
    ArityMismatch { expected: usize, found: usize },
    /// Wrong number of type arguments.
    GenericArityMismatch { expected: usize, found: usize },
    /// No field of that name on the type.
    UnknownField { ty: String, field: String },
    /// No method of that name on the type.
    UnknownMethod { ty: String, method: String },
    /// Methods of that name exist, but none accepts these arguments.
    NoMatchingOverload { ty: String, method: String },
    /// Method type arguments could not be inferred from the value arguments.
    CannotInferGenerics { method: String },
    /// `new` on something that is not a class.
    InvalidConstructorTarget { ty: String },
    /// A `S { ... }` literal whose target is not a struct.
    NotAStruct { ty: String },
    /// A struct literal is missing a field.
    MissingField { ty: String, field: String },
    /// Assignment to something that is not an lvalue.
    NotAssignable,
    /// A method parameter without a type ascription.
    ParameterTypeRequired { name: String },
    /// A lambda parameter whose type is neither ascribed nor expected.
    CannotInferLambdaParam { name: String },
    /// A value type that contains itself by value.
    RecursiveValueType { ty: String },
    /// A class whose primary supertype is not a class.
    InvalidSupertype { ty: String },
    /// `super` in a class with no source-level supertype is fine (object),
    /// but `return` outside a method body is not.
    ReturnOutsideMethod,
    /// Features the compiler knows about but does not implement yet
    /// (fallible patterns, Option over value types).
    NotYetSupported(&'static str),
    /// Compiler bug: unfulfilled indirection read, body re-entered, etc.
    Internal(String),
}

impl fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch { expected, found } => {
                write!(f, "type mismatch: expected `{expected}`, found `{found}`")
            }
            Self::ArityMismatch { expected, found } => {
                write!(f, "arity mismatch: expected {expected} argument(s), found {found}")
            }
            Self::GenericArityMismatch { expected, found } => {
                write!(
                    f,
                    "wrong number of type arguments: expected {expected}, found {found}"
                )
            }
            Self::UnknownField { ty, field } => {
                write!(f, "type `{ty}` has no field `{field}`")
            }
            Self::UnknownMethod { ty, method } => {
                write!(f, "no method `{method}` on type `{ty}`")
            }
            Self::NoMatchingOverload { ty, method } => {
                write!(
                    f,
                    "no overload of `{method}` on type `{ty}` accepts these arguments"
                )
            }
            Self::CannotInferGenerics { method } => {
                write!(
                    f,
                    "cannot infer type arguments for `{method}`; write them explicitly with `::<...>`"
                )
            }
            Self::InvalidConstructorTarget { ty } => {
                write!(f, "`new` needs a class, but `{ty}` is not one")
            }
            Self::NotAStruct { ty } => {
                write!(f, "`{ty}` is not a struct; field literals only build structs")
            }
            Self::MissingField { ty, field } => {
                write!(f, "missing field `{field}` of `{ty}`")
            }
            Self::NotAssignable => write!(f, "this expression cannot be assigned to"),
            Self::ParameterTypeRequired { name } => {
                write!(f, "parameter `{name}` needs a type ascription")
            }
            Self::CannotInferLambdaParam { name } => {
                write!(f, "cannot infer the type of lambda parameter `{name}`")
            }
            Self::RecursiveValueType { ty } => {
                write!(f, "value type `{ty}` contains itself by value")
            }
            Self::InvalidSupertype { ty } => {
                write!(f, "supertype of `{ty}` must be a class")
            }
            Self::ReturnOutsideMethod => write!(f, "`return` outside of a method body"),
            Self::NotYetSupported(what) => write!(f, "{what} are not yet supported"),
            Self::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for TypeError {}
