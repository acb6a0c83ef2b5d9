use std::sync::{Arc, Weak};

use crate::{
    context::typesystem::{TypeContext, TypeContextRc},
    Error, Result,
};

/// A non-owning reference to a [`TypeContext`]
///
/// Used for every edge that points sideways or upwards in the graph (base types, interfaces,
/// declaring types, member signatures), so that only the owning tables keep types alive and
/// cyclic type relationships such as `class A : IComparable<A>` do not leak.
#[derive(Debug, Clone)]
pub struct TypeContextRef {
    weak_ref: Weak<TypeContext>,
}

impl TypeContextRef {
    /// Create a new `TypeContextRef` from a strong reference
    #[must_use]
    pub fn new(strong_ref: &TypeContextRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the type, returning None if the type has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<TypeContextRc> {
        self.weak_ref.upgrade()
    }

    /// Get a strong reference to the type
    ///
    /// # Errors
    /// Returns [`Error::DroppedReference`] if the owning application context is gone.
    pub fn get(&self) -> Result<TypeContextRc> {
        self.weak_ref.upgrade().ok_or(Error::DroppedReference)
    }

    /// Check if the referenced type is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// True if this reference points at `other`
    #[must_use]
    pub fn is(&self, other: &TypeContextRc) -> bool {
        std::ptr::eq(self.weak_ref.as_ptr(), Arc::as_ptr(other))
    }
}

impl From<&TypeContextRc> for TypeContextRef {
    fn from(value: &TypeContextRc) -> Self {
        TypeContextRef::new(value)
    }
}
