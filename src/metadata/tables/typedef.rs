use crate::{
    metadata::{GlobalMetadata, TypeAttributes, VersionRange},
    Result,
};

metadata_record! {
    /// A type definition.
    pub struct TypeDefinition {
        /// String heap index of the name
        pub name_index: i32,
        /// String heap index of the namespace
        pub namespace_index: i32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Registration type index of the by-value type
        pub byval_type_index: i32,
        /// Registration type index of the by-reference type
        @[VersionRange::until(24.5)]
        pub byref_type_index: i32,
        /// Declaring type (registration type index), or -1
        pub declaring_type_index: i32,
        /// Base type (registration type index), or -1
        pub parent_index: i32,
        /// Underlying type of enums (registration type index)
        pub element_type_index: i32,
        /// First runtime generic context entry
        @[VersionRange::until(24.1)]
        pub rgctx_start_index: i32,
        /// Number of runtime generic context entries
        @[VersionRange::until(24.1)]
        pub rgctx_count: i32,
        /// Generic container, or -1
        pub generic_container_index: i32,
        /// `TypeAttributes`
        pub flags: u32,
        /// First field
        pub field_start: i32,
        /// First method
        pub method_start: i32,
        /// First event
        pub event_start: i32,
        /// First property
        pub property_start: i32,
        /// First entry of the nested type index list
        pub nested_types_start: i32,
        /// First entry of the interface type index list
        pub interfaces_start: i32,
        /// First vtable method
        pub vtable_start: i32,
        /// First interface offset pair
        pub interface_offsets_start: i32,
        /// Number of methods
        pub method_count: u16,
        /// Number of properties
        pub property_count: u16,
        /// Number of fields
        pub field_count: u16,
        /// Number of events
        pub event_count: u16,
        /// Number of nested types
        pub nested_type_count: u16,
        /// Number of vtable slots
        pub vtable_count: u16,
        /// Number of implemented interfaces
        pub interfaces_count: u16,
        /// Number of interface offset pairs
        pub interface_offsets_count: u16,
        /// Packed flags: bit 0 value type, bit 1 enum
        pub bitfield: u32,
        /// Metadata token
        @[VersionRange::since(19.0)]
        pub token: u32,
    }
}

impl TypeDefinition {
    /// The unqualified name, including the generic arity suffix (`List`1`)
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }

    /// The namespace, empty for nested and global types
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn namespace<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.namespace_index)
    }

    /// Type attribute flags
    #[must_use]
    pub fn attributes(&self) -> TypeAttributes {
        TypeAttributes::from_bits_retain(self.flags)
    }

    /// True for value types
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.bitfield & 0x1 != 0
    }

    /// True for enums
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.bitfield & 0x2 != 0
    }
}
