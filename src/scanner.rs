//! Lexer for rox source text.
//!
//! [`Scanner`] borrows the source and yields one `Result<Token>` per lexeme.
//! A lexical error is reported for the offending lexeme only and scanning
//! resumes right after it, so a single pass surfaces every bad character,
//! unterminated string and out-of-range number in the file.  The stream
//! always finishes with exactly one `EOF` token and is fused afterwards.
//!
//! Most callers want [`Scanner::scan_tokens`], which splits the stream into
//! the token list handed to the parser and a [`Diagnostics`] holding the
//! errors.  `rox tokenize` iterates directly so it can print tokens and
//! errors in source order.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let (tokens, diagnostics) = Scanner::new("print 1 @ 2;").scan_tokens();
//!
//! assert_eq!(tokens.len(), 5); // print 1 2 ; EOF
//! assert_eq!(diagnostics.len(), 1);
//! ```

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Cursor over borrowed source.  Tokens it emits own their lexemes, so they
/// outlive the text they came from.
pub struct Scanner<'a> {
    text: &'a str,
    src: &'a [u8],              // `text` as bytes
    start: usize,               // first byte of the lexeme being scanned
    curr: usize,                // next unread byte
    line: usize,
    pending: Option<TokenType>, // kind of the lexeme just scanned, if it is a token
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Consume the next byte.  Callers check `is_at_end` first.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Next unread byte, or `0` at end of input.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// The byte after [`peek`](Self::peek), or `0`.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// `pair` if the next byte is `=` (consumed), else `single`.
    #[inline(always)]
    fn with_equal(&mut self, pair: TokenType, single: TokenType) -> TokenType {
        if self.match_byte(b'=') {
            pair
        } else {
            single
        }
    }

    /// Consume the next byte only if it is `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan one lexeme.  Whitespace and comments leave `pending` empty.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b',' => self.pending = Some(TokenType::COMMA),
            b'.' => self.pending = Some(TokenType::DOT),
            b'-' => self.pending = Some(TokenType::MINUS),
            b'+' => self.pending = Some(TokenType::PLUS),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b'*' => self.pending = Some(TokenType::STAR),

            // `!` `=` `<` `>`, each optionally followed by `=`
            b'!' => self.pending = Some(self.with_equal(TokenType::BANG_EQUAL, TokenType::BANG)),
            b'=' => {
                self.pending = Some(self.with_equal(TokenType::EQUAL_EQUAL, TokenType::EQUAL))
            }
            b'<' => self.pending = Some(self.with_equal(TokenType::LESS_EQUAL, TokenType::LESS)),
            b'>' => {
                self.pending = Some(self.with_equal(TokenType::GREATER_EQUAL, TokenType::GREATER))
            }

            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.line += 1;
                return Ok(());
            }

            b'/' => {
                if self.match_byte(b'/') {
                    // the newline itself is left for the line counter
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                }

                self.pending = Some(TokenType::SLASH);
            }

            b'"' => return self.parse_string(),

            b'0'..=b'9' => return self.parse_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            _ => {
                // report and skip a multi-byte character as a whole
                let c: char = self.text[self.start..].chars().next().unwrap_or(b as char);
                self.curr = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        }

        Ok(())
    }

    /// String body up to the closing quote.  Newlines are allowed inside.
    fn parse_string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance();

        // quotes are ASCII, so these are char boundaries
        let s: &str = &self.text[self.start + 1..self.curr - 1];

        self.pending = Some(TokenType::STRING(s.to_owned()));

        Ok(())
    }

    /// Digits with an optional `.digits` tail.  A literal too large for an
    /// `f64` is rejected rather than read as infinity.
    fn parse_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let digits: &str = &self.text[self.start..self.curr];
        let n: f64 = digits.parse::<f64>().unwrap_or(f64::INFINITY);

        if !n.is_finite() {
            return Err(LoxError::lex(self.line, "Number literal out of range."));
        }

        self.pending = Some(TokenType::NUMBER(n));
        Ok(())
    }

    /// Identifier or reserved word.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Scanner<'a> {
    /// Drain the scanner into the parser's token list (ending in `EOF`) and
    /// the lexical errors met along the way.
    pub fn scan_tokens(self) -> (Vec<Token>, Diagnostics) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut diagnostics = Diagnostics::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => diagnostics.push(e),
            }
        }

        info!(
            "Scanned {} token(s) with {} error(s)",
            tokens.len(),
            diagnostics.len()
        );

        (tokens, diagnostics)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            if self.curr == self.len() {
                // one past the end marks EOF as emitted
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.curr;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                debug!("Lexical error on line {}: {}", self.line, e);
                return Some(Err(e));
            }

            if let Some(kind) = self.pending.take() {
                let lexeme: &str = &self.text[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", kind, self.line);

                return Some(Ok(Token::new(kind, lexeme, self.line)));
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
