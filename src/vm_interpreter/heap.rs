use super::object::{ObjFunction, ObjString};
use std::{collections::HashMap, rc::Rc};

/// A handle in the heap's allocation list.
#[derive(Debug)]
pub enum Object {
    String(Rc<ObjString>),
    Function(Rc<ObjFunction>),
}

/// Owner of every heap allocation the compiler and VM make: an allocation
/// list (the hook for a future collector, and the teardown path today) and
/// the string-interning table.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
    strings: HashMap<String, Rc<ObjString>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical string object for `chars`. Equal contents always yield
    /// the same allocation.
    pub fn intern(&mut self, chars: &str) -> Rc<ObjString> {
        if let Some(existing) = self.strings.get(chars) {
            return existing.clone();
        }
        let object = Rc::new(ObjString::new(chars));
        self.strings.insert(chars.to_string(), object.clone());
        self.objects.push(Object::String(object.clone()));
        object
    }

    pub fn alloc_function(&mut self, function: ObjFunction) -> Rc<ObjFunction> {
        let object = Rc::new(function);
        self.objects.push(Object::Function(object.clone()));
        object
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Releases everything the heap ever allocated.
    pub fn free_objects(&mut self) {
        self.strings.clear();
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn interning_reuses_allocations() {
        let mut heap = Heap::new();
        let a = heap.intern("hello");
        let b = heap.intern("hello");
        let c = heap.intern("world");
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        // "hello" was allocated once
        assert_eq!(heap.objects().len(), 2);
    }

    #[test]
    fn every_allocation_lands_on_the_object_list() {
        let mut heap = Heap::new();
        heap.intern("s");
        heap.alloc_function(crate::vm_interpreter::object::ObjFunction::script());
        assert_eq!(heap.objects().len(), 2);
        heap.free_objects();
        assert!(heap.objects().is_empty());
    }
}
