//! Tree-walking evaluator for resolved rox programs.
//!
//! The interpreter owns the global scope, the *current* scope pointer and the
//! binding table filled in by the [`Resolver`](crate::resolver::Resolver).  A
//! variable node found in the table is read exactly `depth` scopes up from the
//! current one; a node missing from the table is a global.
//!
//! `return` is not an error: statement execution yields a [`Signal`] that
//! blocks and loops propagate untouched and only a function call consumes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, INITIALIZER};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::instance::LoxInstance;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Fell through; the next sibling statement runs.
    Completed,

    /// A `return` is unwinding towards the nearest function call.
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    /// Bindings noted while resolving the current unit, flagged when they sit
    /// inside a function body and so may run again after the unit ends.
    unit_locals: Vec<(ExprId, bool)>,
    output: Box<dyn Write>,
}

impl Interpreter {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter whose `print` statements write to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        for native in natives() {
            debug!("Defining native function '{}'", native.name);
            globals
                .borrow_mut()
                .define(native.name, Value::NativeFunction(Rc::new(native)));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            unit_locals: Vec::new(),
            output,
        }
    }

    /// Record that the reference `id` lives `depth` scopes above the scope
    /// active when it is evaluated.
    pub fn note_local(&mut self, id: ExprId, depth: usize, in_function: bool) {
        self.locals.insert(id, depth);
        self.unit_locals.push((id, in_function));
    }

    /// Forget the current unit's bindings that nothing can evaluate again:
    /// its top-level ones, and every one of them if it failed to resolve.
    pub fn finish_unit(&mut self, resolved: bool) {
        let before = self.locals.len();

        for (id, in_function) in self.unit_locals.drain(..) {
            if !(resolved && in_function) {
                self.locals.remove(&id);
            }
        }

        debug!("Released {} binding(s)", before - self.locals.len());
    }

    #[cfg(test)]
    pub(crate) fn binding_count(&self) -> usize {
        self.locals.len()
    }

    /// Execute a program, stopping at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Signal::Return(value) = self.execute(body)? {
                        return Ok(Signal::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                return Ok(Signal::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Signal::Completed)
    }

    /// Run `statements` inside `scope`, restoring the previous scope on every
    /// exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], scope: Environment) -> Result<Signal> {
        let previous = mem::replace(&mut self.environment, Rc::new(RefCell::new(scope)));

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Signal> {
        for stmt in statements {
            if let Signal::Return(value) = self.execute(stmt)? {
                return Ok(Signal::Return(value));
            }
        }
        Ok(Signal::Completed)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Defining class '{}'", name.lexeme);

        // Methods may mention the class before its value exists.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        let closure = match &superclass {
            Some(superclass) => {
                let mut scope = Environment::with_enclosing(Rc::clone(&self.environment));
                scope.define("super", Value::Class(Rc::clone(superclass)));
                Rc::new(RefCell::new(scope))
            }
            None => Rc::clone(&self.environment),
        };

        let methods = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&closure),
                    method.name.lexeme == INITIALIZER,
                );
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let callable = callee.as_callable().ok_or_else(|| {
                    LoxError::runtime(paren, "Can only call functions and classes.")
                })?;

                if values.len() != callable.arity() {
                    return Err(LoxError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                callable.call(self, values, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        match operator.token_type {
            TokenType::EQUAL => {
                let Expr::Variable { id, name } = left else {
                    return Err(LoxError::runtime(operator, "Invalid assignment target."));
                };
                let value = self.evaluate(right)?;
                self.assign_variable(*id, name, value.clone())?;
                return Ok(value);
            }

            TokenType::AND => {
                let left = self.evaluate(left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                return self.evaluate(right);
            }

            TokenType::OR => {
                let left = self.evaluate(left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                return self.evaluate(right);
            }

            _ => {}
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be either both strings or both numbers.",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => {
                let (a, b) = number_operands(operator, &left, &right)?;

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    TokenType::SLASH => Ok(Value::Number(a / b)),
                    TokenType::GREATER => Ok(Value::Bool(a > b)),
                    TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                    TokenType::LESS => Ok(Value::Bool(a < b)),
                    TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                    _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
                }
            }
        }
    }

    /// `super.method`: the superclass sits `depth` scopes up, and the scope
    /// binding `this` is always the one directly inside it.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let depth = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| LoxError::runtime(keyword, "Unresolved 'super'."))?;

        let Value::Class(superclass) = Environment::get_at(&self.environment, depth, keyword)? else {
            return Err(LoxError::runtime(keyword, "Superclass must be a class."));
        };

        let this = Token::identifier("this", keyword.line);
        let object = match depth.checked_sub(1) {
            Some(depth) => Environment::get_at(&self.environment, depth, &this)?,
            None => return Err(LoxError::runtime(keyword, "Unresolved 'this'.")),
        };
        let Value::Instance(instance) = object else {
            return Err(LoxError::runtime(keyword, "Can't use 'super' outside of a method."));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(&instance))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&depth) => Environment::get_at(&self.environment, depth, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> Result<()> {
        match self.locals.get(&id) {
            Some(&depth) => Environment::assign_at(&self.environment, depth, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (Value::Number(_), _) => Err(LoxError::runtime(
            operator,
            format!("Second operand of '{}' must be a number.", operator.lexeme),
        )),
        _ => Err(LoxError::runtime(
            operator,
            format!("First operand of '{}' must be a number.", operator.lexeme),
        )),
    }
}

/// Builtins seeded into every fresh global scope.
fn natives() -> [NativeFunction; 2] {
    [
        NativeFunction {
            name: "clock",
            arity: 0,
            func: |_| {
                let millis = chrono::Utc::now().timestamp_millis();
                Ok(Value::Number(millis as f64 / 1000.0))
            },
        },
        NativeFunction {
            name: "str",
            arity: 1,
            func: |arguments| match arguments {
                [value] => Ok(Value::String(value.to_string())),
                _ => Err("Expected 1 arguments.".to_string()),
            },
        },
    ]
}
