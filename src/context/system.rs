//! The well-known types of the core library.

use std::collections::HashMap;

use crate::{
    binary::Il2CppTypeEnum,
    context::{assembly::AssemblyContextRc, typesystem::{TypeContext, TypeContextRc}},
    Error, Result,
};

/// Well-known types resolved once per application context.
///
/// Every field is a defined type of the core library. Identity checks compare context ids,
/// so they are O(1) and never look at names.
pub struct SystemTypes {
    /// `System.Object`
    pub object: TypeContextRc,
    /// `System.Void`
    pub void: TypeContextRc,
    /// `System.Boolean`
    pub boolean: TypeContextRc,
    /// `System.Char`
    pub char: TypeContextRc,
    /// `System.SByte`
    pub sbyte: TypeContextRc,
    /// `System.Byte`
    pub byte: TypeContextRc,
    /// `System.Int16`
    pub int16: TypeContextRc,
    /// `System.UInt16`
    pub uint16: TypeContextRc,
    /// `System.Int32`
    pub int32: TypeContextRc,
    /// `System.UInt32`
    pub uint32: TypeContextRc,
    /// `System.Int64`
    pub int64: TypeContextRc,
    /// `System.UInt64`
    pub uint64: TypeContextRc,
    /// `System.Single`
    pub single: TypeContextRc,
    /// `System.Double`
    pub double: TypeContextRc,
    /// `System.IntPtr`
    pub intptr: TypeContextRc,
    /// `System.UIntPtr`
    pub uintptr: TypeContextRc,
    /// `System.String`
    pub string: TypeContextRc,
    /// `System.TypedReference`
    pub typed_reference: TypeContextRc,
    /// `System.Type`
    pub type_: TypeContextRc,
    /// `System.Exception`
    pub exception: TypeContextRc,
    /// `System.Attribute`
    pub attribute: TypeContextRc,
    /// `System.Runtime.InteropServices.UnmanagedCallersOnlyAttribute`, newer runtimes only
    pub unmanaged_callers_only: Option<TypeContextRc>,
    by_tag: HashMap<Il2CppTypeEnum, TypeContextRc>,
    tag_by_id: HashMap<u64, Il2CppTypeEnum>,
}

const UNMANAGED_CALLERS_ONLY: &str = "System.Runtime.InteropServices.UnmanagedCallersOnlyAttribute";

fn lookup(core: &AssemblyContextRc, name: &'static str) -> Result<TypeContextRc> {
    core.get_type_by_full_name(name)
        .ok_or(Error::WellKnownTypeMissing(name))
}

impl SystemTypes {
    /// Resolve every well-known type from `core`.
    ///
    /// # Errors
    /// Returns [`Error::WellKnownTypeMissing`] for the first type the core library lacks.
    /// `UnmanagedCallersOnlyAttribute` is only required if `require_unmanaged_callers_only`.
    pub fn resolve(core: &AssemblyContextRc, require_unmanaged_callers_only: bool) -> Result<SystemTypes> {
        let unmanaged_callers_only = match core.get_type_by_full_name(UNMANAGED_CALLERS_ONLY) {
            Some(ty) => Some(ty),
            None if require_unmanaged_callers_only => {
                return Err(Error::WellKnownTypeMissing(UNMANAGED_CALLERS_ONLY))
            }
            None => None,
        };

        let mut system = SystemTypes {
            object: lookup(core, "System.Object")?,
            void: lookup(core, "System.Void")?,
            boolean: lookup(core, "System.Boolean")?,
            char: lookup(core, "System.Char")?,
            sbyte: lookup(core, "System.SByte")?,
            byte: lookup(core, "System.Byte")?,
            int16: lookup(core, "System.Int16")?,
            uint16: lookup(core, "System.UInt16")?,
            int32: lookup(core, "System.Int32")?,
            uint32: lookup(core, "System.UInt32")?,
            int64: lookup(core, "System.Int64")?,
            uint64: lookup(core, "System.UInt64")?,
            single: lookup(core, "System.Single")?,
            double: lookup(core, "System.Double")?,
            intptr: lookup(core, "System.IntPtr")?,
            uintptr: lookup(core, "System.UIntPtr")?,
            string: lookup(core, "System.String")?,
            typed_reference: lookup(core, "System.TypedReference")?,
            type_: lookup(core, "System.Type")?,
            exception: lookup(core, "System.Exception")?,
            attribute: lookup(core, "System.Attribute")?,
            unmanaged_callers_only,
            by_tag: HashMap::new(),
            tag_by_id: HashMap::new(),
        };

        let tagged = [
            (Il2CppTypeEnum::Boolean, system.boolean.clone()),
            (Il2CppTypeEnum::Char, system.char.clone()),
            (Il2CppTypeEnum::I1, system.sbyte.clone()),
            (Il2CppTypeEnum::U1, system.byte.clone()),
            (Il2CppTypeEnum::I2, system.int16.clone()),
            (Il2CppTypeEnum::U2, system.uint16.clone()),
            (Il2CppTypeEnum::I4, system.int32.clone()),
            (Il2CppTypeEnum::U4, system.uint32.clone()),
            (Il2CppTypeEnum::I8, system.int64.clone()),
            (Il2CppTypeEnum::U8, system.uint64.clone()),
            (Il2CppTypeEnum::R4, system.single.clone()),
            (Il2CppTypeEnum::R8, system.double.clone()),
            (Il2CppTypeEnum::I, system.intptr.clone()),
            (Il2CppTypeEnum::U, system.uintptr.clone()),
            (Il2CppTypeEnum::String, system.string.clone()),
            (Il2CppTypeEnum::TypedByRef, system.typed_reference.clone()),
            (Il2CppTypeEnum::Object, system.object.clone()),
            (Il2CppTypeEnum::Void, system.void.clone()),
        ];
        for (tag, ty) in tagged {
            system.tag_by_id.insert(ty.id(), tag);
            system.by_tag.insert(tag, ty);
        }

        tracing::debug!(
            core = %core.name,
            unmanaged_callers_only = system.unmanaged_callers_only.is_some(),
            "resolved system types"
        );

        Ok(system)
    }

    /// True for `Boolean`, `Char` and the numeric primitives including `IntPtr`/`UIntPtr`
    #[must_use]
    pub fn is_primitive(&self, ty: &TypeContext) -> bool {
        self.type_enum_of(ty).is_some_and(Il2CppTypeEnum::is_primitive)
    }

    /// The element type tag of a well-known type
    #[must_use]
    pub fn type_enum_of(&self, ty: &TypeContext) -> Option<Il2CppTypeEnum> {
        self.tag_by_id.get(&ty.id()).copied()
    }

    /// The well-known type for an element type tag
    #[must_use]
    pub fn type_for_enum(&self, tag: Il2CppTypeEnum) -> Option<&TypeContextRc> {
        self.by_tag.get(&tag)
    }

    /// True if `ty` is `System.Object`
    #[must_use]
    pub fn is_object(&self, ty: &TypeContext) -> bool {
        ty.id() == self.object.id()
    }

    /// True if `ty` is `System.Void`
    #[must_use]
    pub fn is_void(&self, ty: &TypeContext) -> bool {
        ty.id() == self.void.id()
    }

    /// True if `ty` is `System.String`
    #[must_use]
    pub fn is_string(&self, ty: &TypeContext) -> bool {
        ty.id() == self.string.id()
    }

    /// True if `ty` is `System.Type`
    #[must_use]
    pub fn is_type(&self, ty: &TypeContext) -> bool {
        ty.id() == self.type_.id()
    }
}

impl std::fmt::Debug for SystemTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemTypes")
            .field("object", &self.object.id())
            .field("tags", &self.by_tag.len())
            .field("unmanaged_callers_only", &self.unmanaged_callers_only.is_some())
            .finish()
    }
}
