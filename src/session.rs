//! One interpreter plus the scan → parse → resolve → interpret pipeline.
//!
//! A [`Session`] is what the CLI drives for `run`, `evaluate` and every REPL
//! line.  State (globals, functions, classes) persists across calls; a failed
//! unit leaves whatever it defined before the failure in place.

use std::io::Write;

use log::{debug, info};

use crate::ast::{Expr, Stmt};
use crate::error::{Diagnostics, RunError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::value::Value;

pub struct Session {
    interpreter: Interpreter,
}

impl Session {
    /// Session printing to standard output.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Session whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
        }
    }

    /// Run `source` as a program.  Nothing executes if any static stage
    /// reported an error.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        info!("Running unit of {} byte(s)", source.len());

        let statements = parse_program(source)?;

        if let Err(diagnostics) = Resolver::new(&mut self.interpreter).resolve(&statements) {
            self.interpreter.finish_unit(false);
            return Err(diagnostics.into());
        }

        let outcome = self.interpreter.interpret(&statements);
        self.interpreter.finish_unit(true);
        outcome?;

        Ok(())
    }

    /// Evaluate `source` as a single expression and return its value.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, RunError> {
        info!("Evaluating expression of {} byte(s)", source.len());

        let expr = parse_expression(source)?;

        let resolved = Resolver::new(&mut self.interpreter).resolve_expression(&expr);
        self.interpreter.finish_unit(resolved.is_ok());
        resolved?;

        let value = self.interpreter.evaluate(&expr)?;
        debug!("Expression evaluated to: {}", value);

        Ok(value)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan and parse a program, merging lexical and syntax diagnostics.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, Diagnostics> {
    let (tokens, mut diagnostics) = Scanner::new(source).scan_tokens();

    match Parser::new(&tokens).parse() {
        Ok(statements) => diagnostics.into_result(statements),
        Err(errors) => {
            diagnostics.extend(errors);
            Err(diagnostics)
        }
    }
}

/// Scan and parse a single expression, merging lexical and syntax diagnostics.
pub fn parse_expression(source: &str) -> Result<Expr, Diagnostics> {
    let (tokens, mut diagnostics) = Scanner::new(source).scan_tokens();

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => diagnostics.into_result(expr),
        Err(errors) => {
            diagnostics.extend(errors);
            Err(diagnostics)
        }
    }
}
