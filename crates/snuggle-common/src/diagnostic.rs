use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// Which compiler pass produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Lexing,
    Parsing,
    Resolution,
    Typing,
    Lowering,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Lexing => "lexing",
            Phase::Parsing => "parsing",
            Phase::Resolution => "resolution",
            Phase::Typing => "typing",
            Phase::Lowering => "lowering",
        };
        write!(f, "{s}")
    }
}

/// A compiler diagnostic: the shape every pass error converts into before
/// reaching the driver.
///
/// Passes keep their own structured error enums; this is the common surface
/// the driver renders. `file` names the source file the span indexes into.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub phase: Phase,
    pub message: String,
    pub span: Span,
    pub file: String,
}

impl Diagnostic {
    /// Create a diagnostic for a user-facing error.
    pub fn new(phase: Phase, message: impl Into<String>, span: Span, file: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            span,
            file: file.into(),
        }
    }

    /// Create a diagnostic for a condition that indicates a bug in the
    /// compiler itself, never in user code. The message is marked so that
    /// reports reach us.
    pub fn internal(phase: Phase, message: impl Into<String>, span: Span, file: impl Into<String>) -> Self {
        Self {
            phase,
            message: format!(
                "internal compiler error: {}. This is a bug in the Snuggle compiler, please report it.",
                message.into()
            ),
            span,
            file: file.into(),
        }
    }

    /// Whether this diagnostic carries the internal-compiler-error marker.
    pub fn is_internal(&self) -> bool {
        self.message.starts_with("internal compiler error")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error in {}: {}", self.phase, self.file, self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_phase_and_file() {
        let d = Diagnostic::new(Phase::Typing, "type mismatch", Span::new(0, 4), "main");
        assert_eq!(d.to_string(), "typing error in main: type mismatch");
        assert!(!d.is_internal());
    }

    #[test]
    fn internal_errors_carry_report_marker() {
        let d = Diagnostic::internal(Phase::Lowering, "unreachable case", Span::new(0, 0), "main");
        assert!(d.is_internal());
        assert!(d.message.contains("please report"));
    }
}
