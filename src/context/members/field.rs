use std::sync::Arc;

use crate::{
    context::{
        extra::ExtraData,
        typesystem::{TypeContextRc, TypeContextRef},
    },
    metadata::{tables::FieldDefinition, FieldAttributes, GlobalMetadata},
    Result,
};

/// Reference counted [`FieldContext`]
pub type FieldContextRc = Arc<FieldContext>;

/// A field bound to its declaring type.
pub struct FieldContext {
    metadata: Arc<GlobalMetadata>,
    index: usize,
    declaring_type: TypeContextRef,
    field_type: TypeContextRef,
    /// Declared name
    pub name: String,
    /// Attribute flags, taken from the type use of the field
    pub flags: FieldAttributes,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

impl FieldContext {
    pub(crate) fn new(
        metadata: Arc<GlobalMetadata>,
        index: usize,
        name: String,
        flags: FieldAttributes,
        declaring_type: &TypeContextRc,
        field_type: &TypeContextRc,
    ) -> Self {
        FieldContext {
            metadata,
            index,
            declaring_type: TypeContextRef::new(declaring_type),
            field_type: TypeContextRef::new(field_type),
            name,
            flags,
            extra: ExtraData::new(),
        }
    }

    /// The field definition row
    #[must_use]
    pub fn definition(&self) -> &FieldDefinition {
        &self.metadata.fields[self.index]
    }

    /// Row index in the field table
    #[must_use]
    pub fn definition_index(&self) -> usize {
        self.index
    }

    /// The declaring type
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeContextRc> {
        self.declaring_type.upgrade()
    }

    /// The field type
    ///
    /// # Errors
    /// Returns [`crate::Error::DroppedReference`] if the application context is gone.
    pub fn field_type(&self) -> Result<TypeContextRc> {
        self.field_type.get()
    }

    /// True for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// True for compile time constants
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// Metadata token
    #[must_use]
    pub fn token(&self) -> u32 {
        self.definition().token
    }
}

impl std::fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldContext")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("flags", &self.flags)
            .finish()
    }
}
