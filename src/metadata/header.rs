#![allow(missing_docs)]

use crate::metadata::VersionRange;

/// Magic value at the start of every `global-metadata.dat`
pub const METADATA_SANITY: u32 = 0xFAB1_1BAF;

metadata_record! {
    /// The global metadata header: sanity, integer version, then one offset/size pair per
    /// table or heap. Sizes are in bytes.
    pub struct MetadataHeader {
        /// Always [`METADATA_SANITY`]
        pub sanity: u32,
        /// Integer part of the format version
        pub version: i32,
        pub string_literal_offset: i32,
        pub string_literal_size: i32,
        pub string_literal_data_offset: i32,
        pub string_literal_data_size: i32,
        /// String heap
        pub string_offset: i32,
        pub string_size: i32,
        pub events_offset: i32,
        pub events_size: i32,
        pub properties_offset: i32,
        pub properties_size: i32,
        pub methods_offset: i32,
        pub methods_size: i32,
        pub parameter_default_values_offset: i32,
        pub parameter_default_values_size: i32,
        pub field_default_values_offset: i32,
        pub field_default_values_size: i32,
        /// Blob heap (default values, public keys)
        pub field_and_parameter_default_value_data_offset: i32,
        pub field_and_parameter_default_value_data_size: i32,
        pub field_marshaled_sizes_offset: i32,
        pub field_marshaled_sizes_size: i32,
        pub parameters_offset: i32,
        pub parameters_size: i32,
        pub fields_offset: i32,
        pub fields_size: i32,
        pub generic_parameters_offset: i32,
        pub generic_parameters_size: i32,
        pub generic_parameter_constraints_offset: i32,
        pub generic_parameter_constraints_size: i32,
        pub generic_containers_offset: i32,
        pub generic_containers_size: i32,
        pub nested_types_offset: i32,
        pub nested_types_size: i32,
        pub interfaces_offset: i32,
        pub interfaces_size: i32,
        pub vtable_methods_offset: i32,
        pub vtable_methods_size: i32,
        pub interface_offsets_offset: i32,
        pub interface_offsets_size: i32,
        pub type_definitions_offset: i32,
        pub type_definitions_size: i32,
        @[VersionRange::until(24.1)]
        pub rgctx_entries_offset: i32,
        @[VersionRange::until(24.1)]
        pub rgctx_entries_count: i32,
        pub images_offset: i32,
        pub images_size: i32,
        pub assemblies_offset: i32,
        pub assemblies_size: i32,
        @[VersionRange::between(19.0, 24.5)]
        pub metadata_usage_lists_offset: i32,
        @[VersionRange::between(19.0, 24.5)]
        pub metadata_usage_lists_count: i32,
        @[VersionRange::between(19.0, 24.5)]
        pub metadata_usage_pairs_offset: i32,
        @[VersionRange::between(19.0, 24.5)]
        pub metadata_usage_pairs_count: i32,
        @[VersionRange::since(19.0)]
        pub field_refs_offset: i32,
        @[VersionRange::since(19.0)]
        pub field_refs_size: i32,
        @[VersionRange::since(20.0)]
        pub referenced_assemblies_offset: i32,
        @[VersionRange::since(20.0)]
        pub referenced_assemblies_size: i32,
        /// Attribute type ranges (before 29)
        @[VersionRange::between(21.0, 27.2)]
        pub attributes_info_offset: i32,
        @[VersionRange::between(21.0, 27.2)]
        pub attributes_info_size: i32,
        /// Attribute type index list (before 29)
        @[VersionRange::between(21.0, 27.2)]
        pub attribute_types_offset: i32,
        @[VersionRange::between(21.0, 27.2)]
        pub attribute_types_size: i32,
        /// Attribute blob heap (29+)
        @[VersionRange::since(29.0)]
        pub attribute_data_offset: i32,
        @[VersionRange::since(29.0)]
        pub attribute_data_size: i32,
        /// Attribute blob ranges (29+)
        @[VersionRange::since(29.0)]
        pub attribute_data_range_offset: i32,
        @[VersionRange::since(29.0)]
        pub attribute_data_range_size: i32,
        @[VersionRange::since(22.0)]
        pub unresolved_virtual_call_parameter_types_offset: i32,
        @[VersionRange::since(22.0)]
        pub unresolved_virtual_call_parameter_types_size: i32,
        @[VersionRange::since(22.0)]
        pub unresolved_virtual_call_parameter_ranges_offset: i32,
        @[VersionRange::since(22.0)]
        pub unresolved_virtual_call_parameter_ranges_size: i32,
        @[VersionRange::since(23.0)]
        pub windows_runtime_type_names_offset: i32,
        @[VersionRange::since(23.0)]
        pub windows_runtime_type_names_size: i32,
        @[VersionRange::since(27.0)]
        pub windows_runtime_strings_offset: i32,
        @[VersionRange::since(27.0)]
        pub windows_runtime_strings_size: i32,
        @[VersionRange::since(24.0)]
        pub exported_type_definitions_offset: i32,
        @[VersionRange::since(24.0)]
        pub exported_type_definitions_size: i32,
    }
}
