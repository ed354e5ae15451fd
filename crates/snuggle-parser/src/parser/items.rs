//! Parsing of files, type definitions, members, patterns, and types.

use snuggle_common::token::TokenKind;
use snuggle_common::Span;

use crate::ast::item::{
    ParsedElement, ParsedField, ParsedFile, ParsedMethod, ParsedTypeDef, ParsedTypeDefKind,
};
use crate::ast::pat::{ParsedPattern, ParsedPatternKind};
use crate::ast::types::{ParsedType, ParsedTypeKind};
use crate::error::ParseError;

use super::Parser;

impl Parser<'_> {
    /// file := element* EOF
    pub(crate) fn parse_file(&mut self, name: String) -> Result<ParsedFile, ParseError> {
        let start = self.peek().span;
        let mut elements = Vec::new();
        while !self.at(TokenKind::Eof) {
            elements.push(self.parse_element()?);
            self.eat(TokenKind::Semicolon);
        }
        let span = start.merge(self.prev_span());
        Ok(ParsedFile { name, elements, span })
    }

    /// element := type-def | expression
    pub(crate) fn parse_element(&mut self) -> Result<ParsedElement, ParseError> {
        if self.starts_type_def() {
            Ok(ParsedElement::TypeDef(self.parse_type_def()?))
        } else {
            Ok(ParsedElement::Expr(self.parse_expr()?))
        }
    }

    /// Whether the current token begins a type definition. `pub` only
    /// prefixes type-defs, so it counts too.
    fn starts_type_def(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Impl
                | TokenKind::Type
                | TokenKind::Pub
        )
    }

    /// type-def := 'pub'? (class | struct | enum | impl | alias)
    fn parse_type_def(&mut self) -> Result<ParsedTypeDef, ParseError> {
        let start = self.peek().span;
        let is_pub = self.eat(TokenKind::Pub);

        match self.peek().kind {
            TokenKind::Class => self.parse_class(is_pub, start),
            TokenKind::Struct => self.parse_struct(is_pub, start),
            TokenKind::Enum => self.parse_enum(is_pub, start),
            TokenKind::Impl => self.parse_impl(start),
            TokenKind::Type => self.parse_alias(is_pub, start),
            _ => Err(self.unexpected("a type definition")),
        }
    }

    /// class := 'class' Ident generics? (':' type)? '{' member* '}'
    fn parse_class(&mut self, is_pub: bool, start: Span) -> Result<ParsedTypeDef, ParseError> {
        self.bump(); // 'class'
        let (name, _) = self.expect_ident("a class name")?;
        let type_params = self.parse_type_params()?;
        let supertype = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let (fields, methods) = self.parse_member_block()?;
        Ok(ParsedTypeDef {
            name,
            is_pub,
            type_params,
            kind: ParsedTypeDefKind::Class { supertype, fields, methods },
            span: start.merge(self.prev_span()),
        })
    }

    /// struct := 'struct' Ident generics? '{' member* '}'
    fn parse_struct(&mut self, is_pub: bool, start: Span) -> Result<ParsedTypeDef, ParseError> {
        self.bump(); // 'struct'
        let (name, _) = self.expect_ident("a struct name")?;
        let type_params = self.parse_type_params()?;
        let (fields, methods) = self.parse_member_block()?;
        Ok(ParsedTypeDef {
            name,
            is_pub,
            type_params,
            kind: ParsedTypeDefKind::Struct { fields, methods },
            span: start.merge(self.prev_span()),
        })
    }

    /// enum := 'enum' Ident '{' variant (',' variant)* method* '}'
    fn parse_enum(&mut self, is_pub: bool, start: Span) -> Result<ParsedTypeDef, ParseError> {
        self.bump(); // 'enum'
        let (name, _) = self.expect_ident("an enum name")?;
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut variants = Vec::new();
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Fn) || self.at(TokenKind::Static) {
                methods.push(self.parse_method()?);
            } else {
                let (variant, _) = self.expect_ident("a variant name")?;
                variants.push(variant);
                self.eat(TokenKind::Comma);
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(ParsedTypeDef {
            name,
            is_pub,
            type_params: Vec::new(),
            kind: ParsedTypeDefKind::Enum { variants, methods },
            span: start.merge(self.prev_span()),
        })
    }

    /// impl := 'impl' Ident '{' method* '}'
    fn parse_impl(&mut self, start: Span) -> Result<ParsedTypeDef, ParseError> {
        self.bump(); // 'impl'
        let (name, _) = self.expect_ident("a type name")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) {
            methods.push(self.parse_method()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(ParsedTypeDef {
            name,
            is_pub: false,
            type_params: Vec::new(),
            kind: ParsedTypeDefKind::Impl { methods },
            span: start.merge(self.prev_span()),
        })
    }

    /// alias := 'type' Ident '=' type
    fn parse_alias(&mut self, is_pub: bool, start: Span) -> Result<ParsedTypeDef, ParseError> {
        self.bump(); // 'type'
        let (name, _) = self.expect_ident("an alias name")?;
        self.expect(TokenKind::Eq, "`=`")?;
        let aliased = self.parse_type()?;
        Ok(ParsedTypeDef {
            name,
            is_pub,
            type_params: Vec::new(),
            kind: ParsedTypeDefKind::Alias(aliased),
            span: start.merge(self.prev_span()),
        })
    }

    /// '{' member* '}' where member := 'static'? (field | method)
    fn parse_member_block(&mut self) -> Result<(Vec<ParsedField>, Vec<ParsedMethod>), ParseError> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Fn) || (self.at(TokenKind::Static) && self.peek2().kind == TokenKind::Fn) {
                methods.push(self.parse_method()?);
            } else {
                fields.push(self.parse_field()?);
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok((fields, methods))
    }

    /// field := 'static'? Ident ':' type
    fn parse_field(&mut self) -> Result<ParsedField, ParseError> {
        let start = self.peek().span;
        let is_static = self.eat(TokenKind::Static);
        let (name, _) = self.expect_ident("a field name")?;
        self.expect(TokenKind::Colon, "`:`")?;
        let ty = self.parse_type()?;
        self.eat(TokenKind::Semicolon);
        Ok(ParsedField {
            name,
            ty,
            is_static,
            span: start.merge(self.prev_span()),
        })
    }

    /// method := 'static'? 'fn' Ident generics? '(' params ')' (':' type)? expr
    pub(crate) fn parse_method(&mut self) -> Result<ParsedMethod, ParseError> {
        let start = self.peek().span;
        let is_static = self.eat(TokenKind::Static);
        self.expect(TokenKind::Fn, "`fn`")?;
        let (name, _) = self.expect_ident("a method name")?;
        let type_params = self.parse_type_params()?;
        let params = self.parse_param_list()?;
        let ret = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_expr()?;
        Ok(ParsedMethod {
            name,
            is_static,
            type_params,
            params,
            ret,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    /// generics := ('<' Ident (',' Ident)* '>')?
    fn parse_type_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        if self.eat(TokenKind::Lt) {
            loop {
                let (name, _) = self.expect_ident("a type parameter")?;
                params.push(name);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt, "`>`")?;
        }
        Ok(params)
    }

    /// '(' (pattern (',' pattern)*)? ')'
    pub(crate) fn parse_param_list(&mut self) -> Result<Vec<ParsedPattern>, ParseError> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                params.push(self.parse_pattern()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(params)
    }

    /// pattern := Ident (':' type)? | '(' pattern (',' pattern)* ')'
    pub(crate) fn parse_pattern(&mut self) -> Result<ParsedPattern, ParseError> {
        let start = self.peek().span;
        if self.eat(TokenKind::LParen) {
            let mut elems = Vec::new();
            if !self.at(TokenKind::RParen) {
                loop {
                    elems.push(self.parse_pattern()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ParsedPattern {
                kind: ParsedPatternKind::Tuple(elems),
                span: start.merge(self.prev_span()),
            });
        }
        let (name, _) = self.expect_ident("a binding name")?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(ParsedPattern {
            kind: ParsedPatternKind::Binding { name, ty },
            span: start.merge(self.prev_span()),
        })
    }

    /// type := 'fn' '(' types ')' ':' type | '(' types ')' | Ident type-args?
    pub(crate) fn parse_type(&mut self) -> Result<ParsedType, ParseError> {
        let start = self.peek().span;

        if self.eat(TokenKind::Fn) {
            self.expect(TokenKind::LParen, "`(`")?;
            let mut params = Vec::new();
            if !self.at(TokenKind::RParen) {
                loop {
                    params.push(self.parse_type()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "`)`")?;
            self.expect(TokenKind::Colon, "`:`")?;
            let ret = Box::new(self.parse_type()?);
            return Ok(ParsedType {
                kind: ParsedTypeKind::Func { params, ret },
                span: start.merge(self.prev_span()),
            });
        }

        if self.eat(TokenKind::LParen) {
            let mut elems = Vec::new();
            if !self.at(TokenKind::RParen) {
                loop {
                    elems.push(self.parse_type()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ParsedType {
                kind: ParsedTypeKind::Tuple(elems),
                span: start.merge(self.prev_span()),
            });
        }

        let (name, _) = self.expect_ident("a type name")?;
        let args = self.parse_type_args()?;
        Ok(ParsedType::named(name, args, start.merge(self.prev_span())))
    }

    /// type-args := ('<' type (',' type)* '>')?
    pub(crate) fn parse_type_args(&mut self) -> Result<Vec<ParsedType>, ParseError> {
        let mut args = Vec::new();
        if self.eat(TokenKind::Lt) {
            loop {
                args.push(self.parse_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt, "`>`")?;
        }
        Ok(args)
    }
}
