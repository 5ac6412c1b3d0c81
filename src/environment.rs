use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope.  Scopes are shared (`Rc<RefCell<_>>`) because every
/// closure created inside a scope keeps it alive and may write through it.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope, shadowing or overwriting.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Value bound in this very scope, ignoring enclosing ones.
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Dynamic lookup through the whole chain.  Used for globals, where the
    /// chain has a single link.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Read `name` from the scope exactly `distance` hops up from `env`.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Result<Value> {
        Self::ancestor(env, distance)
            .and_then(|scope| scope.borrow().get_own(&name.lexeme))
            .ok_or_else(|| undefined(name))
    }

    /// Overwrite `name` in the scope exactly `distance` hops up from `env`.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<()> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Token {
        Token::identifier(text, 1)
    }

    fn shared(env: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(env))
    }

    #[test]
    fn get_at_walks_exact_distance() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));

        let middle = shared(Environment::with_enclosing(Rc::clone(&global)));
        middle.borrow_mut().define("a", Value::Number(2.0));

        let inner = shared(Environment::with_enclosing(Rc::clone(&middle)));

        assert_eq!(
            Environment::get_at(&inner, 1, &name("a")).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            Environment::get_at(&inner, 2, &name("a")).unwrap(),
            Value::Number(1.0)
        );
        assert!(Environment::get_at(&inner, 0, &name("a")).is_err());
        assert!(Environment::get_at(&inner, 5, &name("a")).is_err());
    }

    #[test]
    fn assign_at_only_touches_target_scope() {
        let outer = shared(Environment::new());
        outer.borrow_mut().define("x", Value::Number(1.0));

        let inner = shared(Environment::with_enclosing(Rc::clone(&outer)));
        inner.borrow_mut().define("x", Value::Number(2.0));

        Environment::assign_at(&inner, 0, &name("x"), Value::Number(3.0)).unwrap();

        assert_eq!(outer.borrow().get_own("x"), Some(Value::Number(1.0)));
        assert_eq!(inner.borrow().get_own("x"), Some(Value::Number(3.0)));
    }

    #[test]
    fn dynamic_assign_requires_existing_binding() {
        let mut env = Environment::new();

        let err = env.assign(&name("missing"), Value::Nil).unwrap_err();
        assert!(err.to_string().contains("Undefined variable 'missing'."));

        env.define("present", Value::Nil);
        env.assign(&name("present"), Value::Bool(true)).unwrap();
        assert_eq!(env.get(&name("present")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn shared_scope_mutations_are_visible_to_all_holders() {
        let scope = shared(Environment::new());
        scope.borrow_mut().define("count", Value::Number(0.0));

        let first = shared(Environment::with_enclosing(Rc::clone(&scope)));
        let second = shared(Environment::with_enclosing(Rc::clone(&scope)));

        Environment::assign_at(&first, 1, &name("count"), Value::Number(5.0)).unwrap();

        assert_eq!(
            Environment::get_at(&second, 1, &name("count")).unwrap(),
            Value::Number(5.0)
        );
    }
}
