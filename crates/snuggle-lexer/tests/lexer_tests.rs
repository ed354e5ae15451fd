//! Integration tests for the Snuggle lexer.

use snuggle_common::token::TokenKind;
use snuggle_lexer::{Lexer, LexErrorKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::tokenize(source).tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("class C static fn id"),
        vec![
            TokenKind::Class,
            TokenKind::Ident,
            TokenKind::Static,
            TokenKind::Fn,
            TokenKind::Ident,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn int_literals_with_and_without_suffix() {
    let out = Lexer::tokenize("42 7i64 3i8");
    assert!(out.errors.is_empty());
    let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::IntLiteral,
            TokenKind::IntLiteral,
            TokenKind::IntLiteral,
            TokenKind::Eof,
        ]
    );
    // spans slice back to the original text, suffix included
    assert_eq!(out.tokens[1].span.start, 3);
    assert_eq!(out.tokens[1].span.end, 7);
}

#[test]
fn float_literals() {
    assert_eq!(
        kinds("3.5 2.0f32 9f64"),
        vec![
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn bad_suffix_is_an_error() {
    let out = Lexer::tokenize("5q");
    assert_eq!(out.tokens[0].kind, TokenKind::Error);
    assert!(matches!(
        out.errors[0].kind,
        LexErrorKind::InvalidNumberLiteral(_)
    ));
}

#[test]
fn string_literals_keep_quotes_in_span() {
    let out = Lexer::tokenize(r#""hi\n there""#);
    assert!(out.errors.is_empty());
    assert_eq!(out.tokens[0].kind, TokenKind::StringLiteral);
    assert_eq!(out.tokens[0].span.start, 0);
}

#[test]
fn unterminated_string() {
    let out = Lexer::tokenize("\"oops");
    assert_eq!(out.errors[0].kind, LexErrorKind::UnterminatedString);
}

#[test]
fn turbofish_tokens() {
    assert_eq!(
        kinds("C.id::<i32>(7)"),
        vec![
            TokenKind::Ident,
            TokenKind::Dot,
            TokenKind::Ident,
            TokenKind::ColonColon,
            TokenKind::Lt,
            TokenKind::Ident,
            TokenKind::Gt,
            TokenKind::LParen,
            TokenKind::IntLiteral,
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn comparison_operators() {
    assert_eq!(
        kinds("< <= > >= == != = !"),
        vec![
            TokenKind::Lt,
            TokenKind::LtEq,
            TokenKind::Gt,
            TokenKind::GtEq,
            TokenKind::EqEq,
            TokenKind::NotEq,
            TokenKind::Eq,
            TokenKind::Bang,
            TokenKind::Eof,
        ]
    );
}
