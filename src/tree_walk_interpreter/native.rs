use super::{callable::Callable, error::RuntimeError, value::RuntimeValue, Interpreter};
use crate::side_table::UniqueId;
use std::{
    fmt::{Debug, Display},
    io::Write,
    rc::Rc,
};

pub type NativeFn = fn(&[RuntimeValue]) -> Result<RuntimeValue, RuntimeError>;

#[derive(Clone)]
pub struct NativeFunction(Rc<NativeFunctionInner>);

struct NativeFunctionInner {
    id: UniqueId,
    name: String,
    arity: usize,
    function: NativeFn,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, arity: usize, function: NativeFn) -> Self {
        Self(Rc::new(NativeFunctionInner {
            id: UniqueId::fresh(),
            name: name.into(),
            arity,
            function,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.0.arity
    }

    fn call<W: Write>(
        &self,
        _: &mut Interpreter<W>,
        arguments: &[RuntimeValue],
    ) -> Result<RuntimeValue, RuntimeError> {
        (self.0.function)(arguments)
    }
}

impl Display for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<native fn>")
    }
}
impl Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.0.name)
    }
}
impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
