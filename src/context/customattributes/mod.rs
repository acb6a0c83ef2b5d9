//! Custom attribute decoding.
//!
//! From metadata version 29 on, the complete attribute data of every metadata token is stored
//! in a blob of the attribute data heap: the constructor of every attribute, its positional
//! arguments and its named field and property arguments. [`v29`] decodes these blobs into
//! [`CustomAttribute`] values.
//!
//! Older metadata only records which attribute types apply to a token; the argument values live
//! in generated code. [`legacy`] returns that type list.
//!
//! Type-valued arguments (`typeof(T)`) stay unresolved until read, see
//! [`CustomAttributeTypeParameter::type_context`].

mod legacy;
mod v29;

use std::sync::{Arc, OnceLock, Weak};

use crate::{
    context::{
        assembly::{AssemblyContext, AssemblyContextRc},
        members::{FieldContextRc, MethodContextRc, PropertyContextRc},
        typesystem::TypeContextRc,
    },
    Error, Result,
};

/// One attribute applied to a metadata token.
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// The attribute constructor
    pub constructor: MethodContextRc,
    /// Positional constructor arguments, in order
    pub arguments: Vec<CustomAttributeParameter>,
    /// Named field arguments, in blob order
    pub fields: Vec<CustomAttributeField>,
    /// Named property arguments, in blob order
    pub properties: Vec<CustomAttributeProperty>,
}

impl CustomAttribute {
    /// The attribute type
    #[must_use]
    pub fn attribute_type(&self) -> Option<TypeContextRc> {
        self.constructor.declaring_type()
    }
}

/// A named field argument (`[Attr(Field = value)]`)
#[derive(Debug, Clone)]
pub struct CustomAttributeField {
    /// The assigned field; declared by the attribute type or one of its base types
    pub field: FieldContextRc,
    /// The assigned value
    pub value: CustomAttributeParameter,
}

/// A named property argument (`[Attr(Property = value)]`)
#[derive(Debug, Clone)]
pub struct CustomAttributeProperty {
    /// The assigned property; declared by the attribute type or one of its base types
    pub property: PropertyContextRc,
    /// The assigned value
    pub value: CustomAttributeParameter,
}

/// A decoded attribute argument value.
#[derive(Debug, Clone)]
pub enum CustomAttributeParameter {
    /// `bool`
    Bool(bool),
    /// `char`, as UTF-16 code unit
    Char(u16),
    /// `sbyte`
    I1(i8),
    /// `byte`
    U1(u8),
    /// `short`
    I2(i16),
    /// `ushort`
    U2(u16),
    /// `int`
    I4(i32),
    /// `uint`
    U4(u32),
    /// `long`
    I8(i64),
    /// `ulong`
    U8(u64),
    /// `float`
    R4(f32),
    /// `double`
    R8(f64),
    /// A string, `None` for a null string
    String(Option<String>),
    /// An enum constant: the enum type and the value in its underlying type
    Enum {
        /// The enum type
        enum_type: TypeContextRc,
        /// The constant in the underlying integer type
        value: Box<CustomAttributeParameter>,
    },
    /// A `System.Type` value
    Type(CustomAttributeTypeParameter),
    /// A single-dimensional array, `None` for a null array
    Array(Option<Vec<CustomAttributeParameter>>),
}

impl CustomAttributeParameter {
    /// True for null strings, arrays and types
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            CustomAttributeParameter::String(value) => value.is_none(),
            CustomAttributeParameter::Array(value) => value.is_none(),
            CustomAttributeParameter::Type(value) => value.is_null(),
            _ => false,
        }
    }
}

/// A `System.Type` argument, resolved on first access.
#[derive(Clone)]
pub struct CustomAttributeTypeParameter {
    assembly: Weak<AssemblyContext>,
    type_index: i32,
    resolved: Arc<OnceLock<Option<TypeContextRc>>>,
}

impl CustomAttributeTypeParameter {
    pub(crate) fn new(assembly: &AssemblyContextRc, type_index: i32) -> Self {
        CustomAttributeTypeParameter {
            assembly: Arc::downgrade(assembly),
            type_index,
            resolved: Arc::new(OnceLock::new()),
        }
    }

    /// Registration type index, -1 for `null`
    #[must_use]
    pub fn type_index(&self) -> i32 {
        self.type_index
    }

    /// True for `null` type arguments
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.type_index == -1
    }

    /// True once the type has been resolved
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// The described type, resolved in the assembly that declares the attributed member.
    ///
    /// # Errors
    /// Returns an error if the type index cannot be resolved.
    pub fn type_context(&self) -> Result<Option<TypeContextRc>> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved.clone());
        }

        let resolved = if self.is_null() {
            None
        } else {
            let assembly = self.assembly.upgrade().ok_or(Error::DroppedReference)?;
            Some(assembly.resolve_il2cpp_type(self.type_index)?)
        };
        Ok(self.resolved.get_or_init(|| resolved).clone())
    }
}

impl std::fmt::Debug for CustomAttributeTypeParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.resolved.get() {
            Some(Some(ty)) => write!(f, "typeof({ty})"),
            Some(None) => write!(f, "(Type) null"),
            None => write!(f, "typeof(#{})", self.type_index),
        }
    }
}

impl AssemblyContext {
    /// The attributes applied to `token` of this assembly, decoded from the attribute data
    /// heap (29+). Tokens without attributes yield an empty list.
    ///
    /// # Errors
    /// Returns `NotSupported` before version 29, or an error for malformed blobs.
    pub fn custom_attributes(self: &Arc<Self>, token: u32) -> Result<Vec<CustomAttribute>> {
        let app = self.app()?;
        if app.version().is_less_than(29.0) {
            return Err(Error::NotSupported);
        }

        match self.attribute_data_range(token)? {
            Some(range) => v29::decode(&app, self, app.metadata().attribute_blob(range)?),
            None => Ok(Vec::new()),
        }
    }

    /// The attribute types applied to `token` (before 29).
    ///
    /// Before 24.1 attribute ranges carry no token and are addressed by the legacy
    /// `custom_attribute_index` of the attributed row instead; pass it as `legacy_index`.
    ///
    /// # Errors
    /// Returns `NotSupported` from 29 on, or an error for out of range attribute lists.
    pub fn attribute_types(self: &Arc<Self>, token: u32, legacy_index: i32) -> Result<Vec<TypeContextRc>> {
        legacy::attribute_types(self, token, legacy_index)
    }

    /// Index of the attribute data range of `token` inside this image's range list
    fn attribute_data_range(&self, token: u32) -> Result<Option<usize>> {
        let image = self.image();
        let app = self.app()?;
        let ranges = app.metadata().attribute_data_ranges.range(
            image.custom_attribute_start,
            image.custom_attribute_count as usize,
        )?;

        Ok(ranges
            .binary_search_by_key(&token, |range| range.token)
            .ok()
            .map(|found| image.custom_attribute_start as usize + found))
    }
}
