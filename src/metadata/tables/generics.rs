use crate::{
    metadata::{GenericParameterAttributes, GlobalMetadata},
    Result,
};

metadata_record! {
    /// The generic parameter list of a type or method.
    pub struct GenericContainer {
        /// Owning type definition or method definition index
        pub owner_index: i32,
        /// Number of parameters
        pub type_argc: i32,
        /// Non-zero when the owner is a method
        pub is_method: i32,
        /// First generic parameter
        pub generic_parameter_start: i32,
    }
}

impl GenericContainer {
    /// True if the owner is a method definition
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.is_method != 0
    }

    /// Number of declared parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        usize::try_from(self.type_argc).unwrap_or(0)
    }
}

metadata_record! {
    /// A generic parameter (`T`).
    pub struct GenericParameter {
        /// Owning generic container
        pub owner_index: i32,
        /// String heap index of the name
        pub name_index: i32,
        /// First constraint in the constraint type index list
        pub constraints_start: i16,
        /// Number of constraints
        pub constraints_count: i16,
        /// Position in the owner's parameter list
        pub num: u16,
        /// `GenericParameterAttributes`
        pub flags: u16,
    }
}

impl GenericParameter {
    /// The parameter name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }

    /// Variance and constraint flags
    #[must_use]
    pub fn attributes(&self) -> GenericParameterAttributes {
        GenericParameterAttributes::from_bits_retain(self.flags)
    }
}
