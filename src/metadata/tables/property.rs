use crate::{
    metadata::{GlobalMetadata, VersionRange},
    Result,
};

metadata_record! {
    /// A property definition. Accessors are relative to the declaring type's method start.
    pub struct PropertyDefinition {
        /// String heap index of the name
        pub name_index: i32,
        /// Getter (relative method index), or -1
        pub get: i32,
        /// Setter (relative method index), or -1
        pub set: i32,
        /// `PropertyAttributes`
        pub attrs: u32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Metadata token
        @[VersionRange::since(19.0)]
        pub token: u32,
    }
}

impl PropertyDefinition {
    /// The property name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }
}
