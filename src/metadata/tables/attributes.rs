use crate::metadata::VersionRange;

metadata_record! {
    /// Pre-29 attribute list of one metadata token, as a range of the attribute type list.
    @[VersionRange::until(27.2)]
    pub struct AttributeTypeRange {
        /// Token of the attributed element
        @[VersionRange::since(24.1)]
        pub token: u32,
        /// First attribute type index
        pub start: i32,
        /// Number of attributes
        pub count: i32,
    }
}

metadata_record! {
    /// 29+ attribute blob location of one metadata token.
    ///
    /// The blob of entry `i` ends where the blob of entry `i + 1` starts.
    @[VersionRange::since(29.0)]
    pub struct AttributeDataRange {
        /// Token of the attributed element
        pub token: u32,
        /// Offset of the blob inside the attribute data heap
        pub start_offset: u32,
    }
}
