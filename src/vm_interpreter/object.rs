use super::chunk::Chunk;
use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    rc::Rc,
};

/// FNV-1a, the hash every string object carries alongside its contents.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in chars.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// An immutable heap string. All live `ObjString`s with equal contents are
/// the same allocation (see `Heap::intern`), so value equality is pointer
/// equality.
pub struct ObjString {
    chars: Box<str>,
    hash: u32,
}

impl ObjString {
    pub(super) fn new(chars: &str) -> Self {
        Self {
            chars: chars.into(),
            hash: hash_string(chars),
        }
    }

    pub fn chars(&self) -> &str {
        &self.chars
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl Display for ObjString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.chars)
    }
}
impl Debug for ObjString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.chars)
    }
}

/// Interned-string key: equality and hashing go through the canonical
/// pointer, not the contents. Valid only because the heap guarantees one
/// representative per contents.
#[derive(Debug, Clone)]
pub struct InternedString(pub Rc<ObjString>);

impl PartialEq for InternedString {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for InternedString {}
impl Hash for InternedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.hash());
    }
}
impl Display for InternedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A compiled function: arity, its own chunk, and an optional name (the
/// top-level script has none).
pub struct ObjFunction {
    pub arity: usize,
    pub chunk: Chunk,
    pub name: Option<Rc<ObjString>>,
}

impl ObjFunction {
    pub fn script() -> Self {
        Self {
            arity: 0,
            chunk: Chunk::new(),
            name: None,
        }
    }

    pub fn named(name: Rc<ObjString>) -> Self {
        Self {
            arity: 0,
            chunk: Chunk::new(),
            name: Some(name),
        }
    }

    pub fn name_str(&self) -> &str {
        self.name
            .as_deref()
            .map(ObjString::chars)
            .unwrap_or("<script>")
    }
}

impl Display for ObjFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => f.write_str("<script>"),
        }
    }
}
impl Debug for ObjFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
