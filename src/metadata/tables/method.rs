use crate::{
    metadata::{GlobalMetadata, MethodAttributes, VersionRange},
    Result,
};

metadata_record! {
    /// A method definition.
    pub struct MethodDefinition {
        /// String heap index of the name
        pub name_index: i32,
        /// Declaring type definition index
        pub declaring_type: i32,
        /// Registration type index of the return type
        pub return_type: i32,
        /// First parameter
        pub parameter_start: i32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Generic container, or -1
        pub generic_container_index: i32,
        /// Index into the flat method pointer table (before per-module code registration)
        @[VersionRange::until(24.1)]
        pub method_index: i32,
        /// Invoker index
        @[VersionRange::until(24.1)]
        pub invoker_index: i32,
        /// Delegate wrapper index
        @[VersionRange::until(24.1)]
        pub delegate_wrapper_index: i32,
        /// First runtime generic context entry
        @[VersionRange::until(24.1)]
        pub rgctx_start_index: i32,
        /// Number of runtime generic context entries
        @[VersionRange::until(24.1)]
        pub rgctx_count: i32,
        /// Metadata token
        pub token: u32,
        /// `MethodAttributes`
        pub flags: u16,
        /// `MethodImplAttributes`
        pub iflags: u16,
        /// Vtable slot
        pub slot: u16,
        /// Number of parameters
        pub parameter_count: u16,
    }
}

impl MethodDefinition {
    /// The method name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }

    /// Method attribute flags
    #[must_use]
    pub fn attributes(&self) -> MethodAttributes {
        MethodAttributes::from_bits_retain(self.flags)
    }
}
