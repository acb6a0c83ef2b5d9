use crate::{
    metadata::{GlobalMetadata, VersionRange},
    Result,
};

metadata_record! {
    /// A field definition.
    pub struct FieldDefinition {
        /// String heap index of the name
        pub name_index: i32,
        /// Registration type index; the type's attrs carry the `FieldAttributes`
        pub type_index: i32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Metadata token
        @[VersionRange::since(19.0)]
        pub token: u32,
    }
}

impl FieldDefinition {
    /// The field name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }
}
