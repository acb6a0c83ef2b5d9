//! Load configuration for an application context

use crate::metadata::MetadataVersion;

/// Configuration for building an [`crate::context::ApplicationContext`]
///
/// The structural graph (assemblies, types, members, definition indices) is always built;
/// these options control the expensive or optional stages layered on top of it.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LoadOptions {
    /// Decode the metadata with this layout revision instead of the integer version stored in
    /// the header. Needed for sub-revisions such as 24.2 or 29.1, which share a header value
    /// with their predecessor.
    pub version_override: Option<MetadataVersion>,

    /// Build a context for every concrete generic method instantiation in the registration
    pub build_generic_methods: bool,

    /// Fetch the raw code bytes of concrete generic methods while building them
    pub fetch_method_bytes: bool,

    /// Build the native address to method index
    pub build_address_index: bool,

    /// Name of the core library holding the well-known system types
    pub core_assembly: String,

    /// Fail the load if the core library lacks `UnmanagedCallersOnlyAttribute` (newer runtimes)
    pub require_unmanaged_callers_only: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            version_override: None,
            build_generic_methods: true,
            fetch_method_bytes: true,
            build_address_index: true,
            core_assembly: "mscorlib".to_string(),
            require_unmanaged_callers_only: false,
        }
    }
}

impl LoadOptions {
    /// Only the structural graph: no generic instantiations, code bytes or address index
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            build_generic_methods: false,
            fetch_method_bytes: false,
            build_address_index: false,
            ..Self::default()
        }
    }

    /// Everything, including the check for `UnmanagedCallersOnlyAttribute`
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            require_unmanaged_callers_only: true,
            ..Self::default()
        }
    }

    /// Set the metadata layout revision
    #[must_use]
    pub fn with_version(mut self, version: MetadataVersion) -> Self {
        self.version_override = Some(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let default = LoadOptions::default();
        assert!(default.build_generic_methods);
        assert_eq!(default.core_assembly, "mscorlib");
        assert!(!default.require_unmanaged_callers_only);

        let minimal = LoadOptions::minimal();
        assert!(!minimal.build_generic_methods);
        assert!(!minimal.build_address_index);
        assert_eq!(minimal.core_assembly, default.core_assembly);

        let comprehensive = LoadOptions::comprehensive().with_version(MetadataVersion::new(29.1));
        assert!(comprehensive.require_unmanaged_callers_only);
        assert_eq!(comprehensive.version_override, Some(MetadataVersion::new(29.1)));
    }
}
