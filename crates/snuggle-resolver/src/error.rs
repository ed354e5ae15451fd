use std::fmt;

use snuggle_common::{Diagnostic, Phase, Span};
use snuggle_parser::ParseError;

/// A resolution error. Resolution is fail-fast.
#[derive(Debug)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub span: Span,
    /// File the span indexes into.
    pub file: String,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, span: Span, file: impl Into<String>) -> Self {
        Self { kind, span, file: file.into() }
    }

    /// Convert into the driver-facing diagnostic shape.
    pub fn into_diagnostic(self) -> Diagnostic {
        match &self.kind {
            ResolveErrorKind::DoubleFulfillment(_) => {
                Diagnostic::internal(Phase::Resolution, self.kind.to_string(), self.span, self.file)
            }
            ResolveErrorKind::Parse(err) => err.clone().into_diagnostic(&self.file),
            _ => Diagnostic::new(Phase::Resolution, self.kind.to_string(), self.span, self.file),
        }
    }
}

#[derive(Debug)]
pub enum ResolveErrorKind {
    /// An identifier in expression position that nothing binds.
    UnknownIdentifier(String),
    /// A type name that nothing binds.
    UnknownType(String),
    /// A type name used where a value is needed (and no call/member follows).
    TypeUsedAsValue(String),
    /// A generic parameter applied to type arguments (`T<i32>`).
    GenericTypeParam(String),
    /// `import` of a file the loader does not know.
    MissingFile(String),
    /// A cycle of imports (`a` imports `b` imports `a`).
    ImportCycle(String),
    /// `super` anywhere but directly as a method-call receiver inside a
    /// method.
    StraySuper,
    /// `impl` of a name that is not a source-defined type.
    InvalidImplTarget(String),
    /// An indirection fulfilled twice. Compiler bug.
    DoubleFulfillment(String),
    /// A parse error in an imported file.
    Parse(ParseError),
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIdentifier(name) => write!(f, "unknown identifier `{name}`"),
            Self::UnknownType(name) => write!(f, "unknown type `{name}`"),
            Self::TypeUsedAsValue(name) => {
                write!(f, "`{name}` is a type, not a value")
            }
            Self::GenericTypeParam(name) => {
                write!(f, "type parameter `{name}` cannot take type arguments")
            }
            Self::MissingFile(path) => write!(f, "imported file `{path}` was not found"),
            Self::ImportCycle(path) => {
                write!(f, "import cycle through `{path}`")
            }
            Self::StraySuper => {
                write!(f, "`super` is only allowed as the receiver of a method call")
            }
            Self::InvalidImplTarget(name) => {
                write!(f, "`impl {name}` needs `{name}` to be a class, struct, or enum defined in source")
            }
            Self::DoubleFulfillment(name) => {
                write!(f, "type definition `{name}` resolved twice")
            }
            Self::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ResolveError {}
