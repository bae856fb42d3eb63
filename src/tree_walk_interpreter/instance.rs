use super::{class::Class, value::RuntimeValue};
use crate::side_table::UniqueId;
use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{Debug, Display},
    rc::Rc,
};

/// An instance: a reference to its class plus a mutable field table.
/// Fields shadow methods on property access.
#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

struct InstanceInner {
    id: UniqueId,
    class: Class,
    fields: RefCell<HashMap<String, RuntimeValue>>,
}

impl Instance {
    pub fn new(class: Class) -> Self {
        Self(Rc::new(InstanceInner {
            id: UniqueId::fresh(),
            class,
            fields: RefCell::new(HashMap::new()),
        }))
    }

    pub fn get(&self, name: &str) -> Option<RuntimeValue> {
        if let Some(field) = self.0.fields.borrow().get(name) {
            return Some(field.clone());
        }
        self.0
            .class
            .find_method(name)
            .map(|method| RuntimeValue::Function(method.bind(self.clone())))
    }

    pub fn set(&self, name: &str, value: RuntimeValue) {
        self.0.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} instance", self.0.class.name())
    }
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
