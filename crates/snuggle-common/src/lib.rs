// Shared infrastructure for the Snuggle compiler: source locations,
// diagnostics, and source-file access.

pub mod diagnostic;
pub mod source;
pub mod span;
pub mod token;

pub use diagnostic::{Diagnostic, Phase};
pub use source::{FileLoader, SourceSet};
pub use span::{line_col, Span};
pub use token::{Token, TokenKind};
