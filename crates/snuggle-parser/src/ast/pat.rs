use snuggle_common::Span;

use crate::ast::types::ParsedType;

/// A declaration or parameter pattern.
///
/// Covers the three forms the language accepts: a bare binding, a binding
/// with a type ascription, and a tuple of sub-patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPattern {
    pub kind: ParsedPatternKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPatternKind {
    /// `x` or `x: T`.
    Binding {
        name: String,
        ty: Option<ParsedType>,
    },
    /// `(a, b)` -- destructures a plural value positionally.
    Tuple(Vec<ParsedPattern>),
}

impl ParsedPattern {
    /// Names bound by this pattern, in binding order.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            ParsedPatternKind::Binding { name, .. } => out.push(name),
            ParsedPatternKind::Tuple(elems) => {
                for p in elems {
                    p.collect_names(out);
                }
            }
        }
    }
}
