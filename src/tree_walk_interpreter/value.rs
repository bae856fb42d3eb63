use super::{
    class::Class, error::RuntimeError, function::Function, instance::Instance,
    native::NativeFunction,
};
use crate::ast;
use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

/// A value the tree-walk evaluator can produce. `==` is structural for
/// nil/boolean/number/string and identity-based for everything that lives
/// behind an `Rc`.
#[derive(Clone, PartialEq)]
pub enum RuntimeValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    NativeFunction(NativeFunction),
    Function(Function),
    Class(Class),
    Instance(Instance),
}

impl RuntimeValue {
    pub fn nil() -> Self {
        RuntimeValue::Nil
    }

    pub fn type_of(&self) -> ValueType {
        match self {
            RuntimeValue::Nil => ValueType::Nil,
            RuntimeValue::Boolean(_) => ValueType::Boolean,
            RuntimeValue::Number(_) => ValueType::Number,
            RuntimeValue::String(_) => ValueType::String,
            RuntimeValue::NativeFunction(_) | RuntimeValue::Function(_) => ValueType::Function,
            RuntimeValue::Class(_) => ValueType::Class,
            RuntimeValue::Instance(_) => ValueType::Instance,
        }
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(
            self,
            RuntimeValue::Nil | RuntimeValue::Boolean(false)
        )
    }

    pub fn as_number<F: FnOnce() -> RuntimeError>(&self, make_error: F) -> Result<f64, RuntimeError> {
        match self {
            RuntimeValue::Number(value) => Ok(*value),
            _ => Err(make_error()),
        }
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        RuntimeValue::Number(value)
    }
}
impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        RuntimeValue::Boolean(value)
    }
}
impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        RuntimeValue::String(value.into())
    }
}
impl From<&ast::LiteralValue> for RuntimeValue {
    fn from(value: &ast::LiteralValue) -> Self {
        match value {
            ast::LiteralValue::Number(value) => RuntimeValue::Number(*value),
            ast::LiteralValue::String(value) => RuntimeValue::String(value.as_str().into()),
            ast::LiteralValue::Boolean(value) => RuntimeValue::Boolean(*value),
            ast::LiteralValue::Nil => RuntimeValue::Nil,
        }
    }
}

impl Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeValue::Nil => f.write_str("nil"),
            RuntimeValue::Boolean(value) => write!(f, "{}", value),
            // f64's Display is the shortest round-trip decimal and never
            // prints a trailing ".0" for integral values
            RuntimeValue::Number(value) => write!(f, "{}", value),
            RuntimeValue::String(value) => f.write_str(value),
            RuntimeValue::NativeFunction(value) => Display::fmt(value, f),
            RuntimeValue::Function(value) => Display::fmt(value, f),
            RuntimeValue::Class(value) => Display::fmt(value, f),
            RuntimeValue::Instance(value) => Display::fmt(value, f),
        }
    }
}

impl Debug for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeValue::String(value) => write!(f, "{:?}", value),
            other => Display::fmt(other, f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Nil,
    Boolean,
    Number,
    String,
    Function,
    Class,
    Instance,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueType::Nil => "nil",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Function => "function",
            ValueType::Class => "class",
            ValueType::Instance => "instance",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truthiness() {
        assert!(!RuntimeValue::Nil.is_truthy());
        assert!(!RuntimeValue::Boolean(false).is_truthy());
        assert!(RuntimeValue::Boolean(true).is_truthy());
        assert!(RuntimeValue::Number(0.0).is_truthy());
        assert!(RuntimeValue::from("".to_string()).is_truthy());
    }

    #[test]
    fn structural_equality() {
        assert_eq!(RuntimeValue::Nil, RuntimeValue::Nil);
        assert_ne!(RuntimeValue::Nil, RuntimeValue::Number(0.0));
        assert_ne!(RuntimeValue::Nil, RuntimeValue::Boolean(false));
        assert_eq!(
            RuntimeValue::from("a".to_string()),
            RuntimeValue::from("a".to_string())
        );
        assert_ne!(RuntimeValue::Number(1.0), RuntimeValue::from("1".to_string()));
    }

    #[test]
    fn type_names() {
        assert_eq!(RuntimeValue::Nil.type_of().to_string(), "nil");
        assert_eq!(RuntimeValue::Number(1.0).type_of().to_string(), "number");
        assert_eq!(
            RuntimeValue::from("s".to_string()).type_of().to_string(),
            "string"
        );
        assert_eq!(RuntimeValue::Boolean(true).type_of(), ValueType::Boolean);
    }

    #[test]
    fn number_stringification() {
        assert_eq!(RuntimeValue::Number(7.0).to_string(), "7");
        assert_eq!(RuntimeValue::Number(2.5).to_string(), "2.5");
        assert_eq!(RuntimeValue::Number(-0.5).to_string(), "-0.5");
        assert_eq!(RuntimeValue::Number(9007199254740991.0).to_string(), "9007199254740991");
        assert_eq!(RuntimeValue::Number(0.1).to_string(), "0.1");
    }
}
