//! Attribute flag sets stored in metadata records and `Il2CppType::attrs`.

use bitflags::bitflags;

/// Mask of the visibility bits in [`TypeAttributes`]
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;
/// Mask of the member access bits in [`MethodAttributes`] / [`FieldAttributes`]
pub const MEMBER_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Type definition flags
    pub struct TypeAttributes: u32 {
        /// Not visible outside the assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested, public
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, private
        const NESTED_PRIVATE = 0x0000_0003;
        /// Interface type
        const INTERFACE = 0x0000_0020;
        /// Abstract type
        const ABSTRACT = 0x0000_0080;
        /// Sealed type
        const SEALED = 0x0000_0100;
        /// Special name
        const SPECIAL_NAME = 0x0000_0400;
        /// Imported type
        const IMPORT = 0x0000_1000;
        /// Serializable type
        const SERIALIZABLE = 0x0000_2000;
        /// Initialize before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

impl TypeAttributes {
    /// True for interface definitions
    #[must_use]
    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method definition flags
    pub struct MethodAttributes: u16 {
        /// Private
        const PRIVATE = 0x0001;
        /// Public
        const PUBLIC = 0x0006;
        /// Static (no `this`)
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual
        const VIRTUAL = 0x0040;
        /// Hide by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Abstract
        const ABSTRACT = 0x0400;
        /// Special name (accessors, operators)
        const SPECIAL_NAME = 0x0800;
        /// P/Invoke implementation
        const PINVOKE_IMPL = 0x2000;
        /// Runtime special name (`.ctor`, `.cctor`)
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Field flags, carried in the attrs of the field's type
    pub struct FieldAttributes: u16 {
        /// Private
        const PRIVATE = 0x0001;
        /// Public
        const PUBLIC = 0x0006;
        /// Static
        const STATIC = 0x0010;
        /// Read only after initialization
        const INIT_ONLY = 0x0020;
        /// Compile time constant
        const LITERAL = 0x0040;
        /// Has a default value
        const HAS_DEFAULT = 0x8000;
        /// Has an RVA initializer
        const HAS_FIELD_RVA = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Parameter flags, carried in the attrs of the parameter's type
    pub struct ParameterAttributes: u16 {
        /// Input parameter
        const IN = 0x0001;
        /// Output parameter
        const OUT = 0x0002;
        /// Optional parameter
        const OPTIONAL = 0x0010;
        /// Has a default value
        const HAS_DEFAULT = 0x1000;
        /// Has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Generic parameter variance and constraint flags
    pub struct GenericParameterAttributes: u16 {
        /// Covariant (`out T`)
        const COVARIANT = 0x0001;
        /// Contravariant (`in T`)
        const CONTRAVARIANT = 0x0002;
        /// `class` constraint
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// `struct` constraint
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// `new()` constraint
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_flags() {
        let flags = MethodAttributes::from_bits_retain(0x0096);
        assert!(flags.contains(MethodAttributes::STATIC));
        assert!(flags.contains(MethodAttributes::HIDE_BY_SIG));
        assert_eq!(flags.bits() & MEMBER_ACCESS_MASK, 0x0006);
    }

    #[test]
    fn test_type_flags() {
        let flags = TypeAttributes::from_bits_retain(0x0010_00A1);
        assert!(flags.is_interface());
        assert!(flags.contains(TypeAttributes::ABSTRACT));
        assert_eq!(flags.bits() & TYPE_VISIBILITY_MASK, 1);
    }
}
