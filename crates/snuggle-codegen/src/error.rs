use std::fmt;

use snuggle_common::{Diagnostic, Phase, Span};

/// A lowering failure.
///
/// Every variant indicates a compiler bug -- the checker is supposed to
/// reject anything the lowerer cannot handle -- so all of these render with
/// the please-report marker and none are recovered from.
#[derive(Debug)]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub span: Span,
    pub file: String,
}

impl LowerError {
    pub fn new(kind: LowerErrorKind, span: Span, file: impl Into<String>) -> Self {
        Self { kind, span, file: file.into() }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::internal(Phase::Lowering, self.kind.to_string(), self.span, self.file)
    }
}

#[derive(Debug)]
pub enum LowerErrorKind {
    /// A const method survived typing; folding should have consumed it.
    ConstMethodSurvived(String),
    /// A field access whose receiver is neither a reference nor plural.
    BadFieldReceiver(String),
    /// A desired-fields path that does not match the value's layout.
    BadFieldPath(String),
    /// An assignment target shape the checker should have rejected.
    BadAssignTarget,
    /// A type without a computed layout reached the lowerer.
    MissingLayout(String),
}

impl fmt::Display for LowerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstMethodSurvived(name) => {
                write!(f, "const method `{name}` reached the lowerer")
            }
            Self::BadFieldReceiver(ty) => {
                write!(f, "field access on `{ty}`, which is neither a reference nor plural")
            }
            Self::BadFieldPath(path) => {
                write!(f, "field path `{path}` does not exist in the value's layout")
            }
            Self::BadAssignTarget => write!(f, "unassignable target survived typing"),
            Self::MissingLayout(ty) => write!(f, "no layout computed for `{ty}`"),
        }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for LowerError {}
