use crate::{
    metadata::{GlobalMetadata, VersionRange},
    Result,
};

metadata_record! {
    /// A method parameter.
    pub struct ParameterDefinition {
        /// String heap index of the name
        pub name_index: i32,
        /// Metadata token
        pub token: u32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Registration type index; the type's attrs carry the `ParamAttributes`
        pub type_index: i32,
    }
}

impl ParameterDefinition {
    /// The parameter name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }
}
