//! Things that can be applied to arguments: host-provided natives and
//! user-declared functions (classes implement [`Callable`] in `class.rs`).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::instance::LoxInstance;
use crate::interpreter::{Interpreter, Signal};
use crate::token::Token;
use crate::value::Value;

pub trait Callable {
    /// Exact number of arguments a call must supply.
    fn arity(&self) -> usize;

    /// Invoke with already-evaluated arguments.  `paren` is the call site's
    /// closing parenthesis, used to locate errors.
    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value>;
}

/// A builtin with a fixed arity and a host body.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> std::result::Result<Value, String>,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        self: Rc<Self>,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A user function: its declaration plus the scope it closed over.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// A copy of this method whose closure gains one scope holding `this`.
    /// Each lookup binds afresh, so one method serves every instance.
    pub fn bind(&self, instance: &Rc<RefCell<LoxInstance>>) -> Rc<LoxFunction> {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(Rc::clone(instance)));

        Rc::new(LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        })
    }

    /// The instance an initializer always yields, whatever its body returned.
    fn bound_this(&self, paren: &Token) -> Result<Value> {
        self.closure
            .borrow()
            .get_own("this")
            .ok_or_else(|| LoxError::runtime(paren, "Initializer called without an instance."))
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        // Parent is the closure, not the caller's scope.
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let signal = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return self.bound_this(paren);
        }

        Ok(match signal {
            Signal::Return(value) => value,
            Signal::Completed => Value::Nil,
        })
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.declaration.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
