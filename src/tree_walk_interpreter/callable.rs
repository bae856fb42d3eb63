use super::{error::RuntimeError, value::RuntimeValue, Interpreter};
use std::io::Write;

/// The single calling contract shared by user functions, classes, and
/// natives. The caller has already checked arity against `arity()`.
pub trait Callable {
    fn arity(&self) -> usize;
    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: &[RuntimeValue],
    ) -> Result<RuntimeValue, RuntimeError>;
}
