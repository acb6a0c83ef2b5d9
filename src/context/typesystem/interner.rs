use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::context::{
    assembly::AssemblyContextRc,
    typesystem::{TypeContext, TypeContextRc, TypeKind},
};

/// Structural identity of a synthesized type shape, by component ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeKey {
    GenericInstance(u64, Vec<u64>),
    SzArray(u64),
    Array(u64, u8),
    Pointer(u64),
    ByRef(u64),
    FunctionPointer,
}

/// The canonicalization table for every type shape that is not a defined type.
///
/// Insert-or-fetch goes through the `DashMap` entry API, so when several workers request the
/// same key concurrently exactly one instance is created and all of them receive it.
#[derive(Default)]
pub(crate) struct TypeInterner {
    next_id: AtomicU64,
    canonical: DashMap<TypeKey, TypeContextRc>,
}

impl TypeInterner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a context created outside of the table
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocate `count` consecutive ids, returning the first
    pub(crate) fn reserve(&self, count: usize) -> u64 {
        self.next_id.fetch_add(count as u64, Ordering::Relaxed)
    }

    /// Number of synthesized shapes
    pub(crate) fn len(&self) -> usize {
        self.canonical.len()
    }

    fn intern(&self, key: TypeKey, owner: &AssemblyContextRc, kind: impl FnOnce() -> TypeKind) -> TypeContextRc {
        if let Some(existing) = self.canonical.get(&key) {
            return existing.value().clone();
        }

        match self.canonical.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let context = TypeContext::new(self.next_id(), owner, kind());
                entry.insert(context.clone());
                context
            }
        }
    }

    pub(crate) fn generic_instance(
        &self,
        base: &TypeContextRc,
        args: Vec<TypeContextRc>,
        owner: &AssemblyContextRc,
    ) -> TypeContextRc {
        let key = TypeKey::GenericInstance(base.id(), args.iter().map(|arg| arg.id()).collect());
        self.intern(key, owner, || TypeKind::GenericInstance {
            base: base.clone(),
            args,
        })
    }

    pub(crate) fn sz_array(&self, element: &TypeContextRc, owner: &AssemblyContextRc) -> TypeContextRc {
        self.intern(TypeKey::SzArray(element.id()), owner, || {
            TypeKind::SzArray(element.clone())
        })
    }

    pub(crate) fn array(&self, element: &TypeContextRc, rank: u8, owner: &AssemblyContextRc) -> TypeContextRc {
        self.intern(TypeKey::Array(element.id(), rank), owner, || TypeKind::Array {
            element: element.clone(),
            rank,
        })
    }

    pub(crate) fn pointer(&self, element: &TypeContextRc, owner: &AssemblyContextRc) -> TypeContextRc {
        self.intern(TypeKey::Pointer(element.id()), owner, || {
            TypeKind::Pointer(element.clone())
        })
    }

    pub(crate) fn by_ref(&self, element: &TypeContextRc, owner: &AssemblyContextRc) -> TypeContextRc {
        self.intern(TypeKey::ByRef(element.id()), owner, || {
            TypeKind::ByRef(element.clone())
        })
    }

    pub(crate) fn function_pointer(&self, owner: &AssemblyContextRc) -> TypeContextRc {
        self.intern(TypeKey::FunctionPointer, owner, || TypeKind::FunctionPointer)
    }
}
