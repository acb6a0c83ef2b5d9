use crate::{
    metadata::{GlobalMetadata, VersionRange},
    Result,
};

metadata_record! {
    /// A module image; owns a contiguous range of type definitions.
    pub struct ImageDefinition {
        /// String heap index of the module name (`Assembly-CSharp.dll`)
        pub name_index: i32,
        /// Owning assembly
        pub assembly_index: i32,
        /// First type definition
        pub type_start: i32,
        /// Number of type definitions
        pub type_count: u32,
        /// First exported type
        @[VersionRange::since(24.0)]
        pub exported_type_start: i32,
        /// Number of exported types
        @[VersionRange::since(24.0)]
        pub exported_type_count: u32,
        /// Entry point method, or -1
        pub entry_point_index: i32,
        /// Metadata token
        @[VersionRange::since(19.0)]
        pub token: u32,
        /// First custom attribute range
        @[VersionRange::since(24.1)]
        pub custom_attribute_start: i32,
        /// Number of custom attribute ranges
        @[VersionRange::since(24.1)]
        pub custom_attribute_count: u32,
    }
}

impl ImageDefinition {
    /// The module name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }
}
