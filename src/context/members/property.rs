use std::sync::{Arc, Weak};

use crate::{
    context::{
        extra::ExtraData,
        members::{MethodContext, MethodContextRc},
        typesystem::{TypeContextRc, TypeContextRef},
    },
    metadata::{tables::PropertyDefinition, GlobalMetadata},
    Result,
};

/// Reference counted [`PropertyContext`]
pub type PropertyContextRc = Arc<PropertyContext>;

/// A property bound to its declaring type.
///
/// Properties have no type of their own in IL2CPP metadata. The property type is the return
/// type of the getter, or the value parameter of the setter for write-only properties.
pub struct PropertyContext {
    metadata: Arc<GlobalMetadata>,
    index: usize,
    declaring_type: TypeContextRef,
    getter: Option<Weak<MethodContext>>,
    setter: Option<Weak<MethodContext>>,
    /// Declared name
    pub name: String,
    /// Raw `PropertyAttributes`
    pub attrs: u32,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

impl PropertyContext {
    pub(crate) fn new(
        metadata: Arc<GlobalMetadata>,
        index: usize,
        name: String,
        declaring_type: &TypeContextRc,
        getter: Option<&MethodContextRc>,
        setter: Option<&MethodContextRc>,
    ) -> Self {
        let attrs = metadata.properties[index].attrs;
        PropertyContext {
            metadata,
            index,
            declaring_type: TypeContextRef::new(declaring_type),
            getter: getter.map(Arc::downgrade),
            setter: setter.map(Arc::downgrade),
            name,
            attrs,
            extra: ExtraData::new(),
        }
    }

    /// The property definition row
    #[must_use]
    pub fn definition(&self) -> &PropertyDefinition {
        &self.metadata.properties[self.index]
    }

    /// Row index in the property table
    #[must_use]
    pub fn definition_index(&self) -> usize {
        self.index
    }

    /// The declaring type
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeContextRc> {
        self.declaring_type.upgrade()
    }

    /// The `get_` accessor
    #[must_use]
    pub fn getter(&self) -> Option<MethodContextRc> {
        self.getter.as_ref()?.upgrade()
    }

    /// The `set_` accessor
    #[must_use]
    pub fn setter(&self) -> Option<MethodContextRc> {
        self.setter.as_ref()?.upgrade()
    }

    /// The property type
    ///
    /// # Errors
    /// Returns `Malformed` for a property without accessors and
    /// [`crate::Error::DroppedReference`] if the application context is gone.
    pub fn property_type(&self) -> Result<TypeContextRc> {
        if let Some(getter) = self.getter() {
            return getter.return_type();
        }

        let setter = self
            .setter()
            .ok_or_else(|| malformed_error!("Property {} has no accessors", self.name))?;
        match setter.parameters().last() {
            Some(value) => value.parameter_type(),
            None => Err(malformed_error!("Setter of property {} takes no value", self.name)),
        }
    }

    /// True if either accessor is static
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.getter()
            .or_else(|| self.setter())
            .is_some_and(|accessor| accessor.is_static())
    }

    /// Metadata token
    #[must_use]
    pub fn token(&self) -> u32 {
        self.definition().token
    }
}

impl std::fmt::Debug for PropertyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyContext")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}
