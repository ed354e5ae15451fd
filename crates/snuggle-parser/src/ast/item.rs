use snuggle_common::Span;

use crate::ast::expr::ParsedExpr;
use crate::ast::pat::ParsedPattern;
use crate::ast::types::ParsedType;

/// A parsed source file: a name (the string `import` uses to refer to it)
/// and its top-level block elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub name: String,
    pub elements: Vec<ParsedElement>,
    pub span: Span,
}

/// One element of a block: blocks interleave expressions and type
/// definitions in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedElement {
    Expr(ParsedExpr),
    TypeDef(ParsedTypeDef),
}

/// A type definition. For `impl` blocks, `name` is the target type's name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTypeDef {
    pub name: String,
    pub is_pub: bool,
    pub type_params: Vec<String>,
    pub kind: ParsedTypeDefKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTypeDefKind {
    /// Reference type with an optional primary supertype.
    Class {
        supertype: Option<ParsedType>,
        fields: Vec<ParsedField>,
        methods: Vec<ParsedMethod>,
    },
    /// Plural value type.
    Struct {
        fields: Vec<ParsedField>,
        methods: Vec<ParsedMethod>,
    },
    /// Value type with named variants.
    Enum {
        variants: Vec<String>,
        methods: Vec<ParsedMethod>,
    },
    /// Extension methods for an existing type.
    Impl { methods: Vec<ParsedMethod> },
    /// Transparent name for another type.
    Alias(ParsedType),
}

/// A field member: `static? name: Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedField {
    pub name: String,
    pub ty: ParsedType,
    pub is_static: bool,
    pub span: Span,
}

/// A method member: `static? fn name<T,...>(params): Ret body`.
///
/// The return type defaults to unit when omitted. A class method named
/// `new` is the constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMethod {
    pub name: String,
    pub is_static: bool,
    pub type_params: Vec<String>,
    pub params: Vec<ParsedPattern>,
    pub ret: Option<ParsedType>,
    pub body: ParsedExpr,
    pub span: Span,
}
