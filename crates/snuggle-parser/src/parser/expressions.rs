//! Expression parsing.
//!
//! Pratt-style binding powers for binary operators, which are desugared to
//! method calls on the spot. The `no_struct` flag suppresses raw-struct
//! literals in `if`/`while` condition position, where `cond { ... }` must
//! parse as a condition followed by a block.

use snuggle_common::token::TokenKind;
use snuggle_common::Span;

use crate::ast::expr::{ParsedExpr, ParsedExprKind};
use crate::ast::types::{FloatWidth, IntWidth};
use crate::error::{ParseError, ParseErrorKind};

use super::Parser;

/// Whether a token can begin an expression. Used to decide if `return`
/// carries a value.
fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Ident
            | TokenKind::LParen
            | TokenKind::LBrace
            | TokenKind::New
            | TokenKind::Fn
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Let
            | TokenKind::Import
            | TokenKind::Super
            | TokenKind::Minus
            | TokenKind::Bang
    )
}

/// Left binding power of a binary operator token, or `None` if the token is
/// not a binary operator. Higher binds tighter.
fn binary_power(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::EqEq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq => Some(1),
        TokenKind::Plus | TokenKind::Minus => Some(2),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(3),
        _ => None,
    }
}

/// Method name a binary operator desugars to.
fn binary_method(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Plus => "add",
        TokenKind::Minus => "sub",
        TokenKind::Star => "mul",
        TokenKind::Slash => "div",
        TokenKind::Percent => "rem",
        TokenKind::EqEq => "eq",
        TokenKind::NotEq => "neq",
        TokenKind::Lt => "lt",
        TokenKind::LtEq => "le",
        TokenKind::Gt => "gt",
        TokenKind::GtEq => "ge",
        _ => unreachable!("not a binary operator: {kind:?}"),
    }
}

impl Parser<'_> {
    /// expr := declaration | return | if | while | assignment-or-binary
    pub(crate) fn parse_expr(&mut self) -> Result<ParsedExpr, ParseError> {
        self.parse_expr_inner(false)
    }

    /// Like [`parse_expr`], but raw-struct literals are not recognized at
    /// the top level (condition position).
    fn parse_expr_no_struct(&mut self) -> Result<ParsedExpr, ParseError> {
        self.parse_expr_inner(true)
    }

    fn parse_expr_inner(&mut self, no_struct: bool) -> Result<ParsedExpr, ParseError> {
        let start = self.peek().span;
        match self.peek().kind {
            TokenKind::Let => {
                self.bump();
                let pattern = self.parse_pattern()?;
                self.expect(TokenKind::Eq, "`=`")?;
                let value = Box::new(self.parse_expr()?);
                Ok(ParsedExpr::new(
                    ParsedExprKind::Declaration { pattern, value },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Return => {
                self.bump();
                let value = if starts_expr(self.peek().kind) {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                Ok(ParsedExpr::new(
                    ParsedExprKind::Return(value),
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::If => {
                self.bump();
                let cond = Box::new(self.parse_expr_no_struct()?);
                let then = Box::new(self.parse_expr()?);
                let els = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                Ok(ParsedExpr::new(
                    ParsedExprKind::If { cond, then, els },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::While => {
                self.bump();
                let cond = Box::new(self.parse_expr_no_struct()?);
                let body = Box::new(self.parse_expr()?);
                Ok(ParsedExpr::new(
                    ParsedExprKind::While { cond, body },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Import => {
                self.bump();
                let tok = self.expect(TokenKind::StringLiteral, "a file path string")?;
                let path = self.string_value(&tok)?;
                Ok(ParsedExpr::new(
                    ParsedExprKind::Import(path),
                    start.merge(self.prev_span()),
                ))
            }
            _ => {
                let lhs = self.parse_binary(0, no_struct)?;
                if self.at(TokenKind::Eq) {
                    self.bump();
                    let rhs = Box::new(self.parse_expr()?);
                    let span = lhs.span.merge(self.prev_span());
                    Ok(ParsedExpr::new(
                        ParsedExprKind::Assignment { lhs: Box::new(lhs), rhs },
                        span,
                    ))
                } else {
                    Ok(lhs)
                }
            }
        }
    }

    /// Pratt loop over binary operators; each one desugars to a method call
    /// on its left operand.
    fn parse_binary(&mut self, min_power: u8, no_struct: bool) -> Result<ParsedExpr, ParseError> {
        let mut lhs = self.parse_unary(no_struct)?;
        while let Some(power) = binary_power(self.peek().kind) {
            if power < min_power {
                break;
            }
            let op = self.bump().kind;
            let rhs = self.parse_binary(power + 1, no_struct)?;
            let span = lhs.span.merge(rhs.span);
            lhs = ParsedExpr::new(
                ParsedExprKind::MethodCall {
                    receiver: Box::new(lhs),
                    name: binary_method(op).to_string(),
                    generics: Vec::new(),
                    args: vec![rhs],
                },
                span,
            );
        }
        Ok(lhs)
    }

    /// Prefix `-` and `!`, desugared to `neg` / `not` calls.
    fn parse_unary(&mut self, no_struct: bool) -> Result<ParsedExpr, ParseError> {
        let start = self.peek().span;
        let method = match self.peek().kind {
            TokenKind::Minus => Some("neg"),
            TokenKind::Bang => Some("not"),
            _ => None,
        };
        if let Some(method) = method {
            self.bump();
            let operand = self.parse_unary(no_struct)?;
            let span = start.merge(operand.span);
            return Ok(ParsedExpr::new(
                ParsedExprKind::MethodCall {
                    receiver: Box::new(operand),
                    name: method.to_string(),
                    generics: Vec::new(),
                    args: Vec::new(),
                },
                span,
            ));
        }
        self.parse_postfix(no_struct)
    }

    /// Postfix chain: field access, method call, direct call.
    fn parse_postfix(&mut self, no_struct: bool) -> Result<ParsedExpr, ParseError> {
        let mut expr = self.parse_primary(no_struct)?;
        loop {
            if self.eat(TokenKind::Dot) {
                let (name, _) = self.expect_ident("a member name")?;
                let generics = if self.at(TokenKind::ColonColon) && self.peek2().kind == TokenKind::Lt {
                    self.bump(); // '::'
                    self.parse_type_args()?
                } else {
                    Vec::new()
                };
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    let span = expr.span.merge(self.prev_span());
                    expr = match expr.kind {
                        ParsedExprKind::SuperKeyword => ParsedExpr::new(
                            ParsedExprKind::SuperCall { name, generics, args },
                            span,
                        ),
                        _ => ParsedExpr::new(
                            ParsedExprKind::MethodCall {
                                receiver: Box::new(expr),
                                name,
                                generics,
                                args,
                            },
                            span,
                        ),
                    };
                } else {
                    if !generics.is_empty() {
                        return Err(self.unexpected("`(` after method type arguments"));
                    }
                    let span = expr.span.merge(self.prev_span());
                    expr = ParsedExpr::new(
                        ParsedExprKind::FieldAccess { receiver: Box::new(expr), name },
                        span,
                    );
                }
            } else if self.at(TokenKind::LParen) {
                let args = self.parse_args()?;
                let span = expr.span.merge(self.prev_span());
                expr = ParsedExpr::new(
                    ParsedExprKind::Call {
                        callee: Box::new(expr),
                        generics: Vec::new(),
                        args,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Primary expressions: literals, identifiers, `super`, `new`, lambdas,
    /// tuples/parens, blocks, raw-struct literals.
    fn parse_primary(&mut self, no_struct: bool) -> Result<ParsedExpr, ParseError> {
        let start = self.peek().span;
        match self.peek().kind {
            TokenKind::IntLiteral => {
                let tok = self.bump();
                let (value, width) = self.int_value(&tok)?;
                Ok(ParsedExpr::new(ParsedExprKind::IntLiteral { value, width }, tok.span))
            }
            TokenKind::FloatLiteral => {
                let tok = self.bump();
                let (value, width) = self.float_value(&tok)?;
                Ok(ParsedExpr::new(ParsedExprKind::FloatLiteral { value, width }, tok.span))
            }
            TokenKind::StringLiteral => {
                let tok = self.bump();
                let value = self.string_value(&tok)?;
                Ok(ParsedExpr::new(ParsedExprKind::StringLiteral(value), tok.span))
            }
            TokenKind::True => {
                self.bump();
                Ok(ParsedExpr::new(ParsedExprKind::BoolLiteral(true), start))
            }
            TokenKind::False => {
                self.bump();
                Ok(ParsedExpr::new(ParsedExprKind::BoolLiteral(false), start))
            }
            TokenKind::Super => {
                self.bump();
                Ok(ParsedExpr::new(ParsedExprKind::SuperKeyword, start))
            }
            TokenKind::New => {
                self.bump();
                let ty = self.parse_type()?;
                let args = self.parse_args()?;
                Ok(ParsedExpr::new(
                    ParsedExprKind::ConstructorCall { ty, args },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Fn => {
                self.bump();
                let params = self.parse_param_list()?;
                let ret = if self.eat(TokenKind::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let body = Box::new(self.parse_expr()?);
                Ok(ParsedExpr::new(
                    ParsedExprKind::Lambda { params, ret, body },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Ident => {
                let tok = self.bump();
                let name = self.text(&tok).to_string();
                // Raw-struct literal: `Name { field: ..., }`. Lookahead past
                // the brace so `x` followed by a block statement stays a
                // variable.
                if !no_struct && self.at(TokenKind::LBrace) && self.looks_like_struct_body() {
                    let ty = crate::ast::types::ParsedType::named(name, Vec::new(), tok.span);
                    let fields = self.parse_struct_fields()?;
                    return Ok(ParsedExpr::new(
                        ParsedExprKind::RawStructConstructor { ty, fields },
                        start.merge(self.prev_span()),
                    ));
                }
                Ok(ParsedExpr::new(ParsedExprKind::Variable(name), tok.span))
            }
            TokenKind::LParen => self.parse_paren_or_tuple(start),
            TokenKind::LBrace => self.parse_block(start),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// After an identifier, decide whether `{` opens a struct literal body:
    /// `{ }` or `{ ident : ... }`.
    fn looks_like_struct_body(&self) -> bool {
        debug_assert!(self.at(TokenKind::LBrace));
        match self.peek2().kind {
            TokenKind::RBrace => true,
            TokenKind::Ident => self.peek_nth(2).kind == TokenKind::Colon,
            _ => false,
        }
    }

    /// '{' (Ident ':' expr ','?)* '}'
    fn parse_struct_fields(&mut self) -> Result<Vec<(String, ParsedExpr)>, ParseError> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let (name, _) = self.expect_ident("a field name")?;
            self.expect(TokenKind::Colon, "`:`")?;
            let value = self.parse_expr()?;
            fields.push((name, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(fields)
    }

    /// '(' ')' is unit, '(' e ')' is parenthesized, '(' e ',' ... ')' a tuple.
    fn parse_paren_or_tuple(&mut self, start: Span) -> Result<ParsedExpr, ParseError> {
        self.expect(TokenKind::LParen, "`(`")?;
        if self.eat(TokenKind::RParen) {
            return Ok(ParsedExpr::new(
                ParsedExprKind::Tuple(Vec::new()),
                start.merge(self.prev_span()),
            ));
        }
        let first = self.parse_expr()?;
        if self.eat(TokenKind::RParen) {
            let span = start.merge(self.prev_span());
            return Ok(ParsedExpr::new(
                ParsedExprKind::Parenthesized(Box::new(first)),
                span,
            ));
        }
        let mut elems = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RParen) {
                break;
            }
            elems.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(ParsedExpr::new(
            ParsedExprKind::Tuple(elems),
            start.merge(self.prev_span()),
        ))
    }

    /// '{' element* '}'
    fn parse_block(&mut self, start: Span) -> Result<ParsedExpr, ParseError> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut elements = Vec::new();
        while !self.at(TokenKind::RBrace) {
            elements.push(self.parse_element()?);
            self.eat(TokenKind::Semicolon);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(ParsedExpr::new(
            ParsedExprKind::Block(elements),
            start.merge(self.prev_span()),
        ))
    }

    /// '(' (expr (',' expr)*)? ')'
    fn parse_args(&mut self) -> Result<Vec<ParsedExpr>, ParseError> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(args)
    }

    // ── Literal conversion ─────────────────────────────────────────────

    /// Split a numeric token's text into (digits, width suffix).
    fn split_suffix<'a>(text: &'a str, suffixes: &[&'static str]) -> (&'a str, Option<&'static str>) {
        for s in suffixes {
            if let Some(stripped) = text.strip_suffix(s) {
                return (stripped, Some(s));
            }
        }
        (text, None)
    }

    fn int_value(&self, tok: &snuggle_common::Token) -> Result<(i64, Option<IntWidth>), ParseError> {
        let text = self.text(tok);
        let (digits, suffix) = Self::split_suffix(text, &["i8", "i16", "i32", "i64"]);
        let value: i64 = digits
            .parse()
            .map_err(|_| ParseError::new(ParseErrorKind::InvalidLiteral(text.to_string()), tok.span))?;
        let width = suffix.map(|s| match s {
            "i8" => IntWidth::I8,
            "i16" => IntWidth::I16,
            "i32" => IntWidth::I32,
            _ => IntWidth::I64,
        });
        Ok((value, width))
    }

    fn float_value(&self, tok: &snuggle_common::Token) -> Result<(f64, Option<FloatWidth>), ParseError> {
        let text = self.text(tok);
        let (digits, suffix) = Self::split_suffix(text, &["f32", "f64"]);
        let value: f64 = digits
            .parse()
            .map_err(|_| ParseError::new(ParseErrorKind::InvalidLiteral(text.to_string()), tok.span))?;
        let width = suffix.map(|s| if s == "f32" { FloatWidth::F32 } else { FloatWidth::F64 });
        Ok((value, width))
    }

    /// Strip quotes and resolve escapes in a string literal token.
    fn string_value(&self, tok: &snuggle_common::Token) -> Result<String, ParseError> {
        let text = self.text(tok);
        let inner = &text[1..text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    // The lexer already reported anything else.
                    Some(other) => out.push(other),
                    None => {}
                }
            } else {
                out.push(c);
            }
        }
        Ok(out)
    }
}
