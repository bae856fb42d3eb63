use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Process-unique identity for a syntax-tree node. The resolver keys its
/// results off these, so equivalent subtrees from different parse sites
/// never alias.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct UniqueId(usize);
impl UniqueId {
    pub fn fresh() -> Self {
        UniqueId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}
impl Default for UniqueId {
    fn default() -> Self {
        Self::fresh()
    }
}

pub trait Unique {
    fn id(&self) -> UniqueId;
}

/// Map from nodes (by identity) to out-of-band data about them.
#[derive(Debug)]
pub struct SideTable<Owner: Unique, T> {
    entries: HashMap<UniqueId, T>,
    owner: PhantomData<Owner>,
}

impl<Owner: Unique, T> SideTable<Owner, T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            owner: PhantomData,
        }
    }
    pub fn get(&self, owner: &Owner) -> Option<&T> {
        self.entries.get(&owner.id())
    }
    pub fn set(&mut self, owner: &Owner, value: T) -> Option<T> {
        self.entries.insert(owner.id(), value)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Owner: Unique, T> Default for SideTable<Owner, T> {
    fn default() -> Self {
        Self::new()
    }
}
