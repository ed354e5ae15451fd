use std::fmt;

use snuggle_common::token::TokenKind;
use snuggle_common::{Diagnostic, Phase, Span};
use snuggle_lexer::LexError;

/// A parse error. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Convert into the driver-facing diagnostic shape.
    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        Diagnostic::new(Phase::Parsing, self.kind.to_string(), self.span, file)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The parser needed one thing and found another.
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
    },
    /// A literal's text could not be converted to a value (e.g. overflow).
    InvalidLiteral(String),
    /// The lexer flagged this region; carried through so the span is exact.
    Lex(LexError),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found:?}")
            }
            Self::InvalidLiteral(text) => write!(f, "invalid literal: {text}"),
            Self::Lex(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        let span = err.span;
        ParseError::new(ParseErrorKind::Lex(err), span)
    }
}
