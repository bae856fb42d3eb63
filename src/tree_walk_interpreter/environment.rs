use super::value::RuntimeValue;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One scope in the environment chain. The chain is a linked list of
/// ref-counted cells so closures can keep their defining scopes alive.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, RuntimeValue>,
    enclosing: Option<EnvironmentRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_inside(enclosing: EnvironmentRef) -> Self {
        Environment {
            enclosing: Some(enclosing),
            ..Default::default()
        }
    }

    pub fn wrap(self) -> EnvironmentRef {
        Rc::new(RefCell::new(self))
    }

    /// Binds `name` in this scope, shadowing any previous binding here.
    /// Static duplicate checks are the resolver's job.
    pub fn define(&mut self, name: &str, value: RuntimeValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Looks `name` up through the whole chain.
    pub fn get(&self, name: &str) -> Option<RuntimeValue> {
        self.values.get(name).cloned().or_else(|| {
            self.enclosing
                .as_ref()
                .and_then(|enclosing| enclosing.borrow().get(name))
        })
    }

    /// Assigns through the chain; false when `name` is bound nowhere.
    pub fn assign(&mut self, name: &str, value: RuntimeValue) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// The scope exactly `distance` hops up from `env`.
    pub fn ancestor_of(env: &EnvironmentRef, distance: usize) -> Option<EnvironmentRef> {
        let mut current = env.clone();
        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }
        Some(current)
    }

    /// Reads from the scope exactly `distance` hops up. No fallback to
    /// enclosing scopes: the resolver promised the binding is there.
    pub fn get_at(env: &EnvironmentRef, distance: usize, name: &str) -> Option<RuntimeValue> {
        Self::ancestor_of(env, distance)
            .and_then(|scope| scope.borrow().values.get(name).cloned())
    }

    /// Writes to the scope exactly `distance` hops up.
    pub fn assign_at(
        env: &EnvironmentRef,
        distance: usize,
        name: &str,
        value: RuntimeValue,
    ) -> bool {
        match Self::ancestor_of(env, distance) {
            Some(scope) => {
                scope.borrow_mut().values.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chain_lookup_and_assignment() {
        let globals = Environment::new().wrap();
        globals.borrow_mut().define("a", RuntimeValue::Number(1.0));

        let inner = Environment::new_inside(globals.clone()).wrap();
        assert_eq!(inner.borrow().get("a"), Some(RuntimeValue::Number(1.0)));

        assert!(inner.borrow_mut().assign("a", RuntimeValue::Number(2.0)));
        assert_eq!(globals.borrow().get("a"), Some(RuntimeValue::Number(2.0)));
        assert!(!inner.borrow_mut().assign("missing", RuntimeValue::Nil));
    }

    #[test]
    fn distance_reads_are_exact() {
        let globals = Environment::new().wrap();
        globals.borrow_mut().define("x", RuntimeValue::Number(0.0));
        globals.borrow_mut().define("g", RuntimeValue::Nil);

        let middle = Environment::new_inside(globals).wrap();
        middle.borrow_mut().define("x", RuntimeValue::Number(1.0));

        let inner = Environment::new_inside(middle).wrap();
        inner.borrow_mut().define("x", RuntimeValue::Number(2.0));

        assert_eq!(
            Environment::get_at(&inner, 0, "x"),
            Some(RuntimeValue::Number(2.0))
        );
        assert_eq!(
            Environment::get_at(&inner, 1, "x"),
            Some(RuntimeValue::Number(1.0))
        );
        assert_eq!(
            Environment::get_at(&inner, 2, "x"),
            Some(RuntimeValue::Number(0.0))
        );
        // never falls back to an enclosing scope
        assert_eq!(Environment::get_at(&inner, 1, "g"), None);
        assert_eq!(Environment::get_at(&inner, 3, "x"), None);
    }

    #[test]
    fn assignment_at_distance_zero_hits_the_innermost_scope() {
        let globals = Environment::new().wrap();
        globals.borrow_mut().define("x", RuntimeValue::Number(0.0));
        let inner = Environment::new_inside(globals.clone()).wrap();
        inner.borrow_mut().define("x", RuntimeValue::Number(1.0));

        assert!(Environment::assign_at(
            &inner,
            0,
            "x",
            RuntimeValue::Number(9.0)
        ));
        assert_eq!(
            Environment::get_at(&inner, 0, "x"),
            Some(RuntimeValue::Number(9.0))
        );
        assert_eq!(
            Environment::get_at(&globals, 0, "x"),
            Some(RuntimeValue::Number(0.0))
        );
    }
}
