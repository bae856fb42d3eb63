use super::{error::RuntimeError, value::RuntimeValue};

/// Abrupt completion of a statement. `Return` carries a value up to the
/// nearest function-call boundary and nowhere else; it is never folded into
/// the error path.
#[derive(Debug)]
pub enum Unwind {
    Return(RuntimeValue),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

/// Statement execution either produces a value or unwinds.
pub type Execution = Result<RuntimeValue, Unwind>;
