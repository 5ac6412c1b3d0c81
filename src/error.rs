//! Centralised error hierarchy for the **rox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  Static
//! stages never stop at the first problem: they collect every error into a
//! [`Diagnostics`] value and hand it back to the caller, whose emptiness decides
//! whether the next stage runs.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::debug;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// Either ` at end` or ` at '<lexeme>'`.
        location: String,
    },

    /// Static-analysis failure (bad `return`, `this`, `super`, self-reads).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error, pinned to the token that failed.
    #[error("[line {line}] Runtime error at '{lexeme}': {message}")]
    Runtime {
        message: String,
        line: usize,
        lexeme: String,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Formats where a static error happened relative to the offending token.
fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: location(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Runtime error: line={}, msg={}", token.line, message);

        LoxError::Runtime {
            message,
            line: token.line,
            lexeme: token.lexeme.clone(),
        }
    }

    /// Source line the error points at, if it carries one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
            LoxError::Io(_) | LoxError::Utf8(_) => None,
        }
    }

    /// The bare message, without location decoration.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Ordered collection of static errors produced by one pipeline stage.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: LoxError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoxError> {
        self.errors.iter()
    }

    /// `Ok(value)` when nothing was reported, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Diagnostics> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type Item = LoxError;
    type IntoIter = std::vec::IntoIter<LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d LoxError;
    type IntoIter = std::slice::Iter<'d, LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<LoxError> for Diagnostics {
    fn from(error: LoxError) -> Self {
        Diagnostics {
            errors: vec![error],
        }
    }
}

/// Why a whole unit of source (a file or a REPL line) failed.
#[derive(Debug, Error)]
pub enum RunError {
    /// Lex, parse or resolve diagnostics; nothing was executed.
    #[error("{0}")]
    Static(Diagnostics),

    /// Execution started and stopped at this error.
    #[error("{0}")]
    Runtime(LoxError),
}

impl RunError {
    /// Conventional process exit status for this failure (sysexits).
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }
}

impl From<Diagnostics> for RunError {
    fn from(diagnostics: Diagnostics) -> Self {
        RunError::Static(diagnostics)
    }
}

impl From<LoxError> for RunError {
    fn from(error: LoxError) -> Self {
        RunError::Runtime(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_errors_point_at_their_token() {
        let semicolon = Token::new(TokenType::SEMICOLON, ";", 3);
        let eof = Token::new(TokenType::EOF, "", 7);

        assert_eq!(
            LoxError::parse(&semicolon, "Expected expression.").to_string(),
            "[line 3] Error at ';': Expected expression."
        );
        assert_eq!(
            LoxError::resolve(&eof, "Oops.").to_string(),
            "[line 7] Error at end: Oops."
        );
        assert_eq!(
            LoxError::lex(2, "Unterminated string.").to_string(),
            "[line 2] Error: Unterminated string."
        );
    }

    #[test]
    fn runtime_errors_echo_the_lexeme() {
        let plus = Token::new(TokenType::PLUS, "+", 4);
        let err = LoxError::runtime(&plus, "Bad operands.");

        assert_eq!(err.to_string(), "[line 4] Runtime error at '+': Bad operands.");
        assert_eq!(err.line(), Some(4));
        assert_eq!(err.message(), "Bad operands.");
    }

    #[test]
    fn conversions_from_std_errors_have_no_line() {
        let err: LoxError = String::from_utf8(vec![0xff]).unwrap_err().into();

        assert!(matches!(err, LoxError::Utf8(_)));
        assert_eq!(err.line(), None);
    }

    #[test]
    fn diagnostics_render_one_error_per_line() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.push(LoxError::lex(1, "first"));
        diagnostics.extend(Diagnostics::from(LoxError::lex(2, "second")));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics.to_string(),
            "[line 1] Error: first\n[line 2] Error: second"
        );

        let err = RunError::from(diagnostics.into_result(()).unwrap_err());
        assert_eq!(err.exit_code(), 65);
    }
}
