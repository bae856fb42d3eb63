use super::{
    callable::Callable, error::RuntimeError, function::Function, instance::Instance,
    value::RuntimeValue, Interpreter,
};
use crate::{keywords, side_table::UniqueId};
use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    io::Write,
    rc::Rc,
};

/// A class value: name, optional superclass, and the method table built when
/// the declaration executed. Method lookup walks the superclass chain.
#[derive(Clone)]
pub struct Class(Rc<ClassInner>);

struct ClassInner {
    id: UniqueId,
    name: String,
    superclass: Option<Class>,
    methods: HashMap<String, Function>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Class>,
        methods: HashMap<String, Function>,
    ) -> Self {
        Self(Rc::new(ClassInner {
            id: UniqueId::fresh(),
            name: name.into(),
            superclass,
            methods,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn find_method(&self, name: &str) -> Option<Function> {
        self.0.methods.get(name).cloned().or_else(|| {
            self.0
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }
}

impl Callable for Class {
    fn arity(&self) -> usize {
        self.find_method(keywords::INIT)
            .map_or(0, |initializer| initializer.arity())
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: &[RuntimeValue],
    ) -> Result<RuntimeValue, RuntimeError> {
        let instance = Instance::new(self.clone());
        if let Some(initializer) = self.find_method(keywords::INIT) {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }
        Ok(RuntimeValue::Instance(instance))
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.name)
    }
}
impl Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class {}>", self.0.name)
    }
}
impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
