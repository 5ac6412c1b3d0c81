//! Renders syntax trees back into rox source text.
//!
//! Only `Grouping` nodes print parentheses.  Any other tree the parser can
//! build already re-parses to the same shape without them, so
//! `parse(print(tree))` is structurally equal to `tree`.

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => format!("\"{}\"", s),

                LiteralValue::Number(n) => n.to_string(),
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("({})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("{}{}", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                Self::print(left),
                operator.lexeme,
                Self::print(right)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("super.{}", method.lexeme),

            // ── calls and members ───────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let arguments: Vec<String> = arguments.iter().map(Self::print).collect();
                format!("{}({})", Self::print(callee), arguments.join(", "))
            }

            Expr::Get { object, name } => format!("{}.{}", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "{}.{} = {}",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),
        }
    }

    /// One statement per line; nested statements stay on their parent's line.
    pub fn print_program(statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("{};", Self::print(expr)),

            Stmt::Print(expr) => format!("print {};", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("var {} = {};", name.lexeme, Self::print(expr)),
                None => format!("var {};", name.lexeme),
            },

            Stmt::Block(statements) => Self::block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = format!(
                    "if ({}) {}",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                );
                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    out.push_str(&Self::print_stmt(else_branch));
                }
                out
            }

            Stmt::While { condition, body } => {
                format!("while ({}) {}", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::Function(declaration) => format!("fun {}", Self::function(declaration)),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("return {};", Self::print(expr)),
                None => "return;".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out = format!("class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(" < ");
                    out.push_str(&Self::print(superclass));
                }

                if methods.is_empty() {
                    out.push_str(" {}");
                } else {
                    let methods: Vec<String> =
                        methods.iter().map(|method| Self::function(method)).collect();
                    out.push_str(&format!(" {{ {} }}", methods.join(" ")));
                }
                out
            }
        }
    }

    /// `name(params) { body }`, without the `fun` keyword methods omit.
    fn function(declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect();

        format!(
            "{}({}) {}",
            declaration.name.lexeme,
            params.join(", "),
            Self::block(&declaration.body)
        )
    }

    fn block(statements: &[Stmt]) -> String {
        if statements.is_empty() {
            return "{}".into();
        }

        let inner: Vec<String> = statements.iter().map(Self::print_stmt).collect();
        format!("{{ {} }}", inner.join(" "))
    }
}
