//! The Snuggle parser: token stream to owned AST.
//!
//! Hand-written recursive descent with Pratt binding powers for operator
//! expressions. Parsing is fail-fast: the first error aborts the file.

mod expressions;
mod items;

use snuggle_common::token::{Token, TokenKind};
use snuggle_common::Span;

use crate::ast::ParsedFile;
use crate::error::{ParseError, ParseErrorKind};

/// Parse a source file.
///
/// Runs the lexer, then the parser. The first lexer error or parse error
/// aborts; `name` is the file's import path (used by later passes, not here).
pub fn parse(name: impl Into<String>, source: &str) -> Result<ParsedFile, ParseError> {
    let lexed = snuggle_lexer::Lexer::tokenize(source);
    if let Some(err) = lexed.errors.into_iter().next() {
        return Err(err.into());
    }
    let mut parser = Parser::new(source, lexed.tokens);
    parser.parse_file(name.into())
}

/// Token-stream state shared by the item and expression sub-parsers.
pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self { source, tokens, pos: 0 }
    }

    /// The current token. The stream always ends in `Eof`, so this never
    /// runs off the end.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The token after the current one.
    pub(crate) fn peek2(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    /// The token `n` positions after the current one.
    pub(crate) fn peek_nth(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    /// Current token kind.
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume and return the current token.
    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or fail.
    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Build an unexpected-token error at the current position.
    pub(crate) fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected,
                found: self.peek().kind,
            },
            self.peek().span,
        )
    }

    /// Source text covered by a token.
    pub(crate) fn text(&self, tok: &Token) -> &'src str {
        &self.source[tok.span.start as usize..tok.span.end as usize]
    }

    /// Consume an identifier and return its text.
    pub(crate) fn expect_ident(&mut self, expected: &'static str) -> Result<(String, Span), ParseError> {
        let tok = self.expect(TokenKind::Ident, expected)?;
        Ok((self.text(&tok).to_string(), tok.span))
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.pos == 0 {
            Span::point(0)
        } else {
            self.tokens[self.pos - 1].span
        }
    }
}
