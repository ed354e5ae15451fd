//! The parsed (untyped) Snuggle AST.
//!
//! Trees are fully owned; every node carries the [`Span`] of the source text
//! it came from. Later passes consume these nodes and build their own,
//! progressively more elaborated trees.

pub mod expr;
pub mod item;
pub mod pat;
pub mod types;

pub use expr::{ParsedExpr, ParsedExprKind};
pub use item::{ParsedElement, ParsedField, ParsedFile, ParsedMethod, ParsedTypeDef, ParsedTypeDefKind};
pub use pat::{ParsedPattern, ParsedPatternKind};
pub use types::{FloatWidth, IntWidth, ParsedType, ParsedTypeKind};

pub use snuggle_common::Span;
