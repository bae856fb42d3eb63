use super::{
    callable::Callable,
    environment::{Environment, EnvironmentRef},
    error::RuntimeError,
    instance::Instance,
    unwind::Unwind,
    value::RuntimeValue,
    Ctx, Interpreter,
};
use crate::{ast, keywords, side_table::UniqueId};
use itertools::Itertools;
use std::{
    fmt::{Debug, Display},
    io::Write,
    rc::Rc,
};

/// A user function value: the declaration plus the environment in force
/// where it was declared. Binding a method produces a fresh function whose
/// closure additionally carries `this`.
#[derive(Clone)]
pub struct Function(Rc<FunctionInner>);

struct FunctionInner {
    id: UniqueId,
    declaration: Rc<ast::Fun>,
    closure: EnvironmentRef,
    ctx: Ctx,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<ast::Fun>,
        closure: EnvironmentRef,
        ctx: Ctx,
        is_initializer: bool,
    ) -> Self {
        Self(Rc::new(FunctionInner {
            id: UniqueId::fresh(),
            declaration,
            closure,
            ctx,
            is_initializer,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.declaration.name.name
    }

    pub fn bind(&self, instance: Instance) -> Function {
        let mut environment = Environment::new_inside(self.0.closure.clone());
        environment.define(keywords::THIS, RuntimeValue::Instance(instance));
        Function::new(
            self.0.declaration.clone(),
            environment.wrap(),
            self.0.ctx.clone(),
            self.0.is_initializer,
        )
    }

    fn this_receiver(&self) -> RuntimeValue {
        self.0
            .closure
            .borrow()
            .get(keywords::THIS)
            .expect("an initializer's closure always binds 'this'")
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.0.declaration.parameters.len()
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: &[RuntimeValue],
    ) -> Result<RuntimeValue, RuntimeError> {
        let mut call_env = Environment::new_inside(self.0.closure.clone());
        for (parameter, argument) in self.0.declaration.parameters.iter().zip_eq(arguments) {
            call_env.define(&parameter.name, argument.clone());
        }

        let outcome = interpreter.run_with_environment(call_env.wrap(), |interpreter| {
            for stmt in self.0.declaration.body.iter() {
                interpreter.eval_decl_or_stmt(stmt, &self.0.ctx)?;
            }
            Ok(RuntimeValue::nil())
        });

        // the one and only place a return unwind is caught
        match outcome {
            Ok(_) | Err(Unwind::Return(_)) if self.0.is_initializer => Ok(self.this_receiver()),
            Ok(_) => Ok(RuntimeValue::nil()),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
