//! Abstract syntax tree for rox programs.
//!
//! Two closed families, [`Expr`] and [`Stmt`], consumed by exhaustive `match`
//! in the parser, resolver, interpreter and printer.  The tree owns its
//! children top-down; the only sharing is `Rc<FunctionDecl>`, which lets a
//! runtime function keep its body alive after the program that declared it
//! has been dropped (REPL lines).
//!
//! Nodes the resolver annotates (`Variable`, `This`, `Super`) carry an
//! [`ExprId`].  Ids are unique for the life of the process, so two textually
//! identical references resolve independently and a binding recorded for one
//! REPL line can never be confused with a node from another.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::Token;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a variable-reference site; key of the interpreter's binding table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(usize);

impl ExprId {
    /// Allocate an id no other node has.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal - stored as IEEE-754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constants `true` / `false`.
    Bool(bool),

    /// The `nil` literal.
    Nil,
}

/// Every kind of *expression*.
///
/// `Binary` also encodes the logical operators (`and`/`or`) and assignment
/// (`=`, whose left operand is always a `Variable`); consumers tell them apart
/// by the operator's token type.
///
/// Not `Clone`: a copied node would share its [`ExprId`] with the original.
#[derive(Debug, Serialize)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`, `a and b`, `a = b`
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub-expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Function-, method- or constructor-call expression
    /// *Example:* `clock()` or `add(1, 2)`
    Call {
        callee: Box<Expr>,
        /// The closing `)` token - retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

impl Expr {
    /// Build a fresh variable reference.
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }
}

/// A function or method declaration.
#[derive(Debug, Serialize)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter names, in order.
    pub params: Vec<Token>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,
}

/// Complete executable constructs.  A program is a sequence of these nodes
/// returned by [`Parser::parse`](crate::parser::Parser::parse).
#[derive(Debug, Serialize)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration - becomes a first-class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Class declaration with an optional superclass reference (always a
    /// `Variable` expression).
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
