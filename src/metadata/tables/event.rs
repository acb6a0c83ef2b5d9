use crate::{
    metadata::{GlobalMetadata, VersionRange},
    Result,
};

metadata_record! {
    /// An event definition. Accessors are relative to the declaring type's method start.
    pub struct EventDefinition {
        /// String heap index of the name
        pub name_index: i32,
        /// Registration type index of the handler type
        pub type_index: i32,
        /// Add accessor, or -1
        pub add: i32,
        /// Remove accessor, or -1
        pub remove: i32,
        /// Raise accessor, or -1
        pub raise: i32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Metadata token
        @[VersionRange::since(19.0)]
        pub token: u32,
    }
}

impl EventDefinition {
    /// The event name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }
}
