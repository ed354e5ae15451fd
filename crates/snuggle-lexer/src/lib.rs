// Snuggle lexer -- tokenizer for the Snuggle programming language.

pub mod error;

use snuggle_common::token::{keyword_from_str, Token, TokenKind};
use snuggle_common::Span;

pub use error::{LexError, LexErrorKind};

/// The result of tokenizing a source file: the full token stream (ending in
/// `Eof`) plus any errors encountered along the way.
#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// The Snuggle lexer: a byte-indexed scan over the source text.
///
/// Every token-forming character in Snuggle is ASCII (keywords, operators,
/// digits, identifier letters), so the scanner walks raw bytes and keeps the
/// byte position as the span cursor. Full characters are decoded in exactly
/// two places: string-literal contents pass through untouched, and error
/// reporting names the offending character properly. Whitespace (newlines
/// included) and `//` line comments are skipped; Snuggle is
/// layout-insensitive. Bad input produces an `Error` token and a collected
/// [`LexError`], so downstream passes always see the full stream.
pub struct Lexer<'src> {
    source: &'src str,
    pos: u32,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer at the start of the source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The returned token vector always ends with an `Eof` token.
    pub fn tokenize(source: &str) -> LexOutput {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        LexOutput {
            tokens,
            errors: lexer.errors,
        }
    }

    // ── Scanner primitives ─────────────────────────────────────────────

    /// The byte `n` positions ahead of the cursor.
    fn byte_at(&self, n: u32) -> Option<u8> {
        self.source.as_bytes().get((self.pos + n) as usize).copied()
    }

    fn first(&self) -> Option<u8> {
        self.byte_at(0)
    }

    fn second(&self) -> Option<u8> {
        self.byte_at(1)
    }

    /// Step over one byte.
    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Step while the predicate holds for the current byte.
    fn bump_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.first().is_some_and(|b| pred(b)) {
            self.bump();
        }
    }

    /// Source text between a recorded start and the cursor.
    fn text_from(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.pos as usize]
    }

    /// Finish a token that started at `start` and ends at the cursor.
    fn token(&self, kind: TokenKind, start: u32) -> Token {
        Token::new(kind, start, self.pos)
    }

    /// Decode the full character under the cursor and step past it. Only
    /// needed where non-ASCII input can show up.
    fn bump_char(&mut self) -> char {
        let c = self.source[self.pos as usize..]
            .chars()
            .next()
            .unwrap_or('\u{FFFD}');
        self.pos += c.len_utf8() as u32;
        c
    }

    fn report(&mut self, kind: LexErrorKind, start: u32) -> Token {
        self.errors
            .push(LexError::new(kind, Span::new(start, self.pos)));
        self.token(TokenKind::Error, start)
    }

    // ── Tokenization ───────────────────────────────────────────────────

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.pos;
        let Some(b) = self.first() else {
            return Token::new(TokenKind::Eof, start, start);
        };

        match b {
            b'(' => self.single(TokenKind::LParen, start),
            b')' => self.single(TokenKind::RParen, start),
            b'{' => self.single(TokenKind::LBrace, start),
            b'}' => self.single(TokenKind::RBrace, start),
            b',' => self.single(TokenKind::Comma, start),
            b'.' => self.single(TokenKind::Dot, start),
            b';' => self.single(TokenKind::Semicolon, start),
            b'+' => self.single(TokenKind::Plus, start),
            b'-' => self.single(TokenKind::Minus, start),
            b'*' => self.single(TokenKind::Star, start),
            b'/' => self.single(TokenKind::Slash, start),
            b'%' => self.single(TokenKind::Percent, start),

            // Operators that pair with `=`: `= ==`, `! !=`, `< <=`, `> >=`.
            b'=' => self.eq_pair(TokenKind::Eq, TokenKind::EqEq, start),
            b'!' => self.eq_pair(TokenKind::Bang, TokenKind::NotEq, start),
            b'<' => self.eq_pair(TokenKind::Lt, TokenKind::LtEq, start),
            b'>' => self.eq_pair(TokenKind::Gt, TokenKind::GtEq, start),

            b':' => {
                self.bump();
                if self.first() == Some(b':') {
                    self.bump();
                    self.token(TokenKind::ColonColon, start)
                } else {
                    self.token(TokenKind::Colon, start)
                }
            }

            b'0'..=b'9' => self.lex_number(start),
            b'"' => self.lex_string(start),
            b if is_ident_start(b) => self.lex_ident(start),

            _ => {
                let c = self.bump_char();
                self.report(LexErrorKind::UnexpectedCharacter(c), start)
            }
        }
    }

    /// Skip whitespace and `//` line comments, in any interleaving.
    fn skip_trivia(&mut self) {
        loop {
            self.bump_while(|b| b.is_ascii_whitespace());
            if self.first() == Some(b'/') && self.second() == Some(b'/') {
                self.bump_while(|b| b != b'\n');
            } else {
                return;
            }
        }
    }

    /// One-byte token.
    fn single(&mut self, kind: TokenKind, start: u32) -> Token {
        self.bump();
        self.token(kind, start)
    }

    /// `plain`, or `with_eq` when a `=` follows.
    fn eq_pair(&mut self, plain: TokenKind, with_eq: TokenKind, start: u32) -> Token {
        self.bump();
        if self.first() == Some(b'=') {
            self.bump();
            self.token(with_eq, start)
        } else {
            self.token(plain, start)
        }
    }

    /// Numbers: decimal digits, an optional fractional part, and an optional
    /// width suffix (`i8|i16|i32|i64|f32|f64`). The parser converts the
    /// text; the lexer only classifies int vs. float and vets the suffix.
    fn lex_number(&mut self, start: u32) -> Token {
        self.bump_while(|b| b.is_ascii_digit());

        let fractional = self.first() == Some(b'.')
            && self.second().is_some_and(|b| b.is_ascii_digit());
        if fractional {
            self.bump(); // the dot
            self.bump_while(|b| b.is_ascii_digit());
        }

        // A trailing identifier chunk must be a width suffix.
        let mut float_suffix = false;
        if self.first().is_some_and(is_ident_start) {
            let suffix_start = self.pos;
            self.bump_while(is_ident_continue);
            match self.text_from(suffix_start) {
                "i8" | "i16" | "i32" | "i64" => {}
                "f32" | "f64" => float_suffix = true,
                _ => {
                    let text = self.text_from(start).to_string();
                    return self.report(LexErrorKind::InvalidNumberLiteral(text), start);
                }
            }
        }

        let kind = if fractional || float_suffix {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.token(kind, start)
    }

    /// Double-quoted strings with `\n \t \\ \"` escapes. The token span
    /// includes the quotes; escape resolution happens in the parser.
    /// Content bytes pass through untouched, so any UTF-8 text is legal
    /// inside a string.
    fn lex_string(&mut self, start: u32) -> Token {
        self.bump(); // opening quote
        loop {
            match self.first() {
                None | Some(b'\n') => {
                    return self.report(LexErrorKind::UnterminatedString, start);
                }
                Some(b'"') => {
                    self.bump();
                    return self.token(TokenKind::StringLiteral, start);
                }
                Some(b'\\') => {
                    self.bump();
                    match self.first() {
                        Some(b'n' | b't' | b'\\' | b'"') => self.bump(),
                        Some(_) => {
                            let c = self.bump_char();
                            self.errors.push(LexError::new(
                                LexErrorKind::InvalidEscapeSequence(c),
                                Span::new(start, self.pos),
                            ));
                        }
                        None => {}
                    }
                }
                Some(_) => self.bump(),
            }
        }
    }

    /// Identifiers and keywords.
    fn lex_ident(&mut self, start: u32) -> Token {
        self.bump_while(is_ident_continue);
        let kind = keyword_from_str(self.text_from(start)).unwrap_or(TokenKind::Ident);
        self.token(kind, start)
    }
}

/// Whether a byte can start an identifier.
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Whether a byte can continue an identifier.
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_punctuation_and_operators() {
        assert_eq!(
            kinds("( ) { } :: : . ,"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::ColonColon,
                TokenKind::Colon,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_comments() {
        assert_eq!(
            kinds("a // comment\nb"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn a_lone_slash_is_division_not_a_comment() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Ident, TokenKind::Slash, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn unexpected_character_is_collected() {
        let out = Lexer::tokenize("@");
        assert_eq!(out.tokens[0].kind, TokenKind::Error);
        assert_eq!(
            out.errors[0].kind,
            LexErrorKind::UnexpectedCharacter('@')
        );
    }

    #[test]
    fn non_ascii_input_reports_the_whole_character() {
        // One error for the one character, and the span steps past all of
        // its bytes so lexing resumes cleanly.
        let out = Lexer::tokenize("é x");
        assert_eq!(
            out.errors[0].kind,
            LexErrorKind::UnexpectedCharacter('é')
        );
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn strings_pass_utf8_content_through() {
        let out = Lexer::tokenize("\"héllo\"");
        assert!(out.errors.is_empty());
        assert_eq!(out.tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn dot_after_digits_without_a_digit_is_not_fractional() {
        // `1.add(2)` must lex as int, dot, ident -- not a float literal.
        assert_eq!(
            kinds("1.add(2)"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::IntLiteral,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }
}
