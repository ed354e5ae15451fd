use snuggle_common::Span;

use crate::ast::item::ParsedElement;
use crate::ast::pat::ParsedPattern;
use crate::ast::types::{FloatWidth, IntWidth, ParsedType};

/// An expression as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpr {
    pub kind: ParsedExprKind,
    pub span: Span,
}

impl ParsedExpr {
    pub fn new(kind: ParsedExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The closed vocabulary of parsed expressions.
///
/// Binary and unary operators never appear here: the parser desugars them to
/// method calls (`a + b` becomes `a.add(b)`), so every later pass sees one
/// call shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedExprKind {
    /// `import "path"` -- brings a file's public type-defs into scope and
    /// schedules its top-level code.
    Import(String),
    /// Integer literal, width known only if suffixed.
    IntLiteral { value: i64, width: Option<IntWidth> },
    /// Float literal.
    FloatLiteral { value: f64, width: Option<FloatWidth> },
    BoolLiteral(bool),
    StringLiteral(String),
    /// A bare identifier in expression position.
    Variable(String),
    /// `receiver.name` with no argument list.
    FieldAccess {
        receiver: Box<ParsedExpr>,
        name: String,
    },
    /// `receiver.name::<T,...>(args)`.
    MethodCall {
        receiver: Box<ParsedExpr>,
        name: String,
        generics: Vec<ParsedType>,
        args: Vec<ParsedExpr>,
    },
    /// `super.name(args)` -- only legal in this exact shape.
    SuperCall {
        name: String,
        generics: Vec<ParsedType>,
        args: Vec<ParsedExpr>,
    },
    /// `callee(args)` where the callee is not a field access: a bare
    /// identifier (local func value or type) or a parenthesized expression.
    Call {
        callee: Box<ParsedExpr>,
        generics: Vec<ParsedType>,
        args: Vec<ParsedExpr>,
    },
    /// `new C(args)`.
    ConstructorCall {
        ty: ParsedType,
        args: Vec<ParsedExpr>,
    },
    /// `S { field: value, ... }` -- builds a struct value field by field.
    RawStructConstructor {
        ty: ParsedType,
        fields: Vec<(String, ParsedExpr)>,
    },
    /// `(a, b, c)`; the empty tuple `()` is the unit value.
    Tuple(Vec<ParsedExpr>),
    /// `fn(x: T): R body`.
    Lambda {
        params: Vec<ParsedPattern>,
        ret: Option<ParsedType>,
        body: Box<ParsedExpr>,
    },
    /// `let pattern = value`.
    Declaration {
        pattern: ParsedPattern,
        value: Box<ParsedExpr>,
    },
    /// `lvalue = value`.
    Assignment {
        lhs: Box<ParsedExpr>,
        rhs: Box<ParsedExpr>,
    },
    /// `return expr?`.
    Return(Option<Box<ParsedExpr>>),
    If {
        cond: Box<ParsedExpr>,
        then: Box<ParsedExpr>,
        els: Option<Box<ParsedExpr>>,
    },
    While {
        cond: Box<ParsedExpr>,
        body: Box<ParsedExpr>,
    },
    /// `(expr)` -- kept distinct so spans round-trip; resolution unwraps it.
    Parenthesized(Box<ParsedExpr>),
    /// `super` outside of call-receiver position. Always a resolution error;
    /// parsed so the error lands on the right span.
    SuperKeyword,
    /// `{ e1; e2; ... }` -- ordered elements, expressions and type-defs
    /// interleaved.
    Block(Vec<ParsedElement>),
}
