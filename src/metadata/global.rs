//! The decoded `global-metadata.dat` blob.

use std::{ffi::CStr, path::Path};

use crate::{
    file::{parser::Parser, Backend, Memory, Physical},
    metadata::{
        header::{MetadataHeader, METADATA_SANITY},
        tables::{
            AssemblyDefinition, AttributeDataRange, AttributeTypeRange, EventDefinition,
            FieldDefinition, GenericContainer, GenericParameter, ImageDefinition,
            MetadataTable, MethodDefinition, ParameterDefinition, PropertyDefinition,
            TypeDefinition,
        },
        Decode, MetadataReader, MetadataVersion,
    },
    Error, Result,
};

/// All raw tables and heaps of one metadata blob, decoded for one fixed version.
///
/// # Example
///
/// ```rust,no_run
/// use il2scope::metadata::{GlobalMetadata, MetadataVersion};
///
/// let metadata = GlobalMetadata::from_file("global-metadata.dat", Some(MetadataVersion::new(24.4)))?;
/// for image in metadata.images.iter() {
///     println!("{} ({} types)", image.name(&metadata)?, image.type_count);
/// }
/// # Ok::<(), il2scope::Error>(())
/// ```
pub struct GlobalMetadata {
    data: Box<dyn Backend>,
    version: MetadataVersion,
    header: MetadataHeader,

    /// Assembly definitions
    pub assemblies: MetadataTable<AssemblyDefinition>,
    /// Image (module) definitions
    pub images: MetadataTable<ImageDefinition>,
    /// Type definitions of all images
    pub type_definitions: MetadataTable<TypeDefinition>,
    /// Method definitions of all types
    pub methods: MetadataTable<MethodDefinition>,
    /// Parameters of all methods
    pub parameters: MetadataTable<ParameterDefinition>,
    /// Fields of all types
    pub fields: MetadataTable<FieldDefinition>,
    /// Properties of all types
    pub properties: MetadataTable<PropertyDefinition>,
    /// Events of all types
    pub events: MetadataTable<EventDefinition>,
    /// Generic containers of types and methods
    pub generic_containers: MetadataTable<GenericContainer>,
    /// Generic parameters of all containers
    pub generic_parameters: MetadataTable<GenericParameter>,
    /// Constraint type indices, referenced by generic parameters
    pub generic_parameter_constraints: Vec<i32>,
    /// Nested type definition indices, referenced by type definitions
    pub nested_type_indices: Vec<i32>,
    /// Interface type indices, referenced by type definitions
    pub interface_indices: Vec<i32>,
    /// Assembly indices, referenced by assembly definitions
    pub referenced_assemblies: Vec<i32>,
    /// Attribute type ranges (before 29)
    pub attribute_type_ranges: MetadataTable<AttributeTypeRange>,
    /// Attribute type indices (before 29)
    pub attribute_types: Vec<i32>,
    /// Attribute blob ranges (29+)
    pub attribute_data_ranges: MetadataTable<AttributeDataRange>,
}

impl GlobalMetadata {
    /// Load a metadata blob from disk.
    ///
    /// `version` overrides the layout revision; when absent, the integer version stored in the
    /// header is used.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the blob is not valid metadata.
    pub fn from_file(
        path: impl AsRef<Path>,
        version: Option<MetadataVersion>,
    ) -> Result<GlobalMetadata> {
        Self::load(Box::new(Physical::new(path)?), version)
    }

    /// Load a metadata blob from memory, see [`GlobalMetadata::from_file`]
    ///
    /// # Errors
    /// Returns an error if the blob is not valid metadata.
    pub fn from_mem(data: Vec<u8>, version: Option<MetadataVersion>) -> Result<GlobalMetadata> {
        Self::load(Box::new(Memory::new(data)), version)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn load(data: Box<dyn Backend>, version: Option<MetadataVersion>) -> Result<GlobalMetadata> {
        if data.len() == 0 {
            return Err(Error::Empty);
        }

        let mut parser = Parser::new(data.data());
        let sanity = parser.read_le::<u32>()?;
        if sanity != METADATA_SANITY {
            return Err(Error::InvalidSanity(sanity));
        }

        let stored = parser.read_le::<i32>()?;
        #[allow(clippy::cast_precision_loss)]
        let version = version.unwrap_or(MetadataVersion::new(stored as f32));
        if !version.is_supported() {
            return Err(Error::UnsupportedVersion(version));
        }
        if !version.is_at_least(stored as f32) || !version.is_less_than(stored as f32 + 1.0) {
            tracing::warn!(%version, stored, "version override disagrees with the header");
        }

        let header = MetadataReader::new(data.data(), version).read::<MetadataHeader>()?;
        let bytes = data.data();

        let assemblies = read_table(bytes, version, header.assemblies_offset, header.assemblies_size)?;
        let images = read_table(bytes, version, header.images_offset, header.images_size)?;
        let type_definitions = read_table(
            bytes,
            version,
            header.type_definitions_offset,
            header.type_definitions_size,
        )?;
        let methods = read_table(bytes, version, header.methods_offset, header.methods_size)?;
        let parameters =
            read_table(bytes, version, header.parameters_offset, header.parameters_size)?;
        let fields = read_table(bytes, version, header.fields_offset, header.fields_size)?;
        let properties =
            read_table(bytes, version, header.properties_offset, header.properties_size)?;
        let events = read_table(bytes, version, header.events_offset, header.events_size)?;
        let generic_containers = read_table(
            bytes,
            version,
            header.generic_containers_offset,
            header.generic_containers_size,
        )?;
        let generic_parameters = read_table(
            bytes,
            version,
            header.generic_parameters_offset,
            header.generic_parameters_size,
        )?;

        let generic_parameter_constraints = read_rows(
            bytes,
            version,
            header.generic_parameter_constraints_offset,
            header.generic_parameter_constraints_size,
        )?;
        let nested_type_indices = read_rows(
            bytes,
            version,
            header.nested_types_offset,
            header.nested_types_size,
        )?;
        let interface_indices =
            read_rows(bytes, version, header.interfaces_offset, header.interfaces_size)?;
        let referenced_assemblies = read_rows(
            bytes,
            version,
            header.referenced_assemblies_offset,
            header.referenced_assemblies_size,
        )?;

        let (attribute_type_ranges, attribute_types, attribute_data_ranges) =
            if version.is_at_least(29.0) {
                (
                    MetadataTable::new(Vec::new()),
                    Vec::new(),
                    read_table(
                        bytes,
                        version,
                        header.attribute_data_range_offset,
                        header.attribute_data_range_size,
                    )?,
                )
            } else {
                (
                    read_table(
                        bytes,
                        version,
                        header.attributes_info_offset,
                        header.attributes_info_size,
                    )?,
                    read_rows(
                        bytes,
                        version,
                        header.attribute_types_offset,
                        header.attribute_types_size,
                    )?,
                    MetadataTable::new(Vec::new()),
                )
            };

        tracing::debug!(
            %version,
            assemblies = assemblies.len(),
            types = type_definitions.len(),
            methods = methods.len(),
            "decoded metadata tables"
        );

        Ok(GlobalMetadata {
            data,
            version,
            header,
            assemblies,
            images,
            type_definitions,
            methods,
            parameters,
            fields,
            properties,
            events,
            generic_containers,
            generic_parameters,
            generic_parameter_constraints,
            nested_type_indices,
            interface_indices,
            referenced_assemblies,
            attribute_type_ranges,
            attribute_types,
            attribute_data_ranges,
        })
    }

    /// The layout revision all tables were decoded with
    #[must_use]
    pub fn version(&self) -> MetadataVersion {
        self.version
    }

    /// The decoded header
    #[must_use]
    pub fn header(&self) -> &MetadataHeader {
        &self.header
    }

    /// The raw blob
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Look up a NUL-terminated UTF-8 string in the string heap
    ///
    /// # Errors
    /// Returns `Malformed` if the index is outside the heap or the string is not valid UTF-8.
    pub fn string_at(&self, index: i32) -> Result<&str> {
        let heap = region(
            self.data(),
            self.header.string_offset,
            self.header.string_size,
        )?;

        let start = usize::try_from(index)
            .ok()
            .filter(|&i| i < heap.len())
            .ok_or_else(|| malformed_error!("String index out of bounds - {}", index))?;

        let Ok(value) = CStr::from_bytes_until_nul(&heap[start..]) else {
            return Err(malformed_error!("Unterminated string at index {}", index));
        };
        value
            .to_str()
            .map_err(|_| malformed_error!("Invalid UTF-8 string at index {}", index))
    }

    /// Look up a length-prefixed blob in the default value data heap
    ///
    /// # Errors
    /// Returns `Malformed` or `OutOfBounds` if the blob does not fit into the heap.
    pub fn blob_at(&self, index: i32) -> Result<&[u8]> {
        let heap = region(
            self.data(),
            self.header.field_and_parameter_default_value_data_offset,
            self.header.field_and_parameter_default_value_data_size,
        )?;

        let start = usize::try_from(index)
            .ok()
            .filter(|&i| i < heap.len())
            .ok_or_else(|| malformed_error!("Blob index out of bounds - {}", index))?;

        let mut parser = Parser::new(&heap[start..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }

    /// The attribute data heap (29+)
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the header describes a region outside of the blob.
    pub fn attribute_data(&self) -> Result<&[u8]> {
        region(
            self.data(),
            self.header.attribute_data_offset,
            self.header.attribute_data_size,
        )
    }

    /// The attribute blob of attribute data range `index` (29+)
    ///
    /// # Errors
    /// Returns an error if the range or its successor describes bytes outside the heap.
    pub fn attribute_blob(&self, index: usize) -> Result<&[u8]> {
        let heap = self.attribute_data()?;
        let Some(range) = self.attribute_data_ranges.as_slice().get(index) else {
            return Err(malformed_error!("Attribute data range out of bounds - {}", index));
        };

        let start = range.start_offset as usize;
        let end = self
            .attribute_data_ranges
            .as_slice()
            .get(index + 1)
            .map_or(heap.len(), |next| next.start_offset as usize);

        if start > end || end > heap.len() {
            return Err(malformed_error!(
                "Attribute blob {}..{} exceeds heap of {} bytes",
                start,
                end,
                heap.len()
            ));
        }
        Ok(&heap[start..end])
    }

    /// Generic parameter count declared by a generic container index, 0 for -1
    #[must_use]
    pub fn generic_parameter_count(&self, container_index: i32) -> usize {
        self.generic_containers
            .get(container_index)
            .map_or(0, GenericContainer::parameter_count)
    }
}

fn region(data: &[u8], offset: i32, size: i32) -> Result<&[u8]> {
    let (Ok(offset), Ok(size)) = (usize::try_from(offset), usize::try_from(size)) else {
        return Err(malformed_error!("Negative region {} + {}", offset, size));
    };

    match offset.checked_add(size) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(out_of_bounds_error!()),
    }
}

fn read_rows<T: Decode>(
    data: &[u8],
    version: MetadataVersion,
    offset: i32,
    size: i32,
) -> Result<Vec<T>> {
    let bytes = region(data, offset, size)?;
    let record_size = T::encoded_size(version, 8);
    if record_size == 0 {
        return Ok(Vec::new());
    }

    if bytes.len() % record_size != 0 {
        tracing::warn!(
            record = T::NAME,
            size = bytes.len(),
            record_size,
            "table size is not a multiple of the record size"
        );
    }

    MetadataReader::new(bytes, version).read_array(bytes.len() / record_size)
}

fn read_table<T: Decode>(
    data: &[u8],
    version: MetadataVersion,
    offset: i32,
    size: i32,
) -> Result<MetadataTable<T>> {
    read_rows(data, version, offset, size).map(MetadataTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::MetadataBuilder;

    #[test]
    fn test_invalid_sanity() {
        let mut data = vec![0u8; 512];
        data[0..4].copy_from_slice(&0xDEAD_BEEF_u32.to_le_bytes());

        assert!(matches!(
            GlobalMetadata::from_mem(data, None),
            Err(Error::InvalidSanity(0xDEAD_BEEF))
        ));
        assert!(matches!(
            GlobalMetadata::from_mem(Vec::new(), None),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = vec![0u8; 512];
        data[0..4].copy_from_slice(&METADATA_SANITY.to_le_bytes());
        data[4..8].copy_from_slice(&16_i32.to_le_bytes());

        assert!(matches!(
            GlobalMetadata::from_mem(data, None),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_roundtrip_tables() {
        for version in [24.1, 24.15, 24.4, 27.0, 29.0, 31.0] {
            let mut builder = MetadataBuilder::new(MetadataVersion::new(version));
            let assembly = builder.assembly("Game", "Game.dll");
            let ty = builder.type_def(assembly, "Game", "Player");
            builder.method(ty, "Update", &[]);

            let metadata = builder.build().unwrap();

            assert_eq!(metadata.version(), MetadataVersion::new(version));
            assert_eq!(metadata.assemblies.len(), 1);
            assert_eq!(metadata.type_definitions.len(), 1);
            assert_eq!(metadata.methods.len(), 1);
            assert_eq!(
                metadata.assemblies[0].aname.name(&metadata).unwrap(),
                "Game"
            );
            assert_eq!(metadata.images[0].name(&metadata).unwrap(), "Game.dll");
            assert_eq!(
                metadata.type_definitions[0].namespace(&metadata).unwrap(),
                "Game"
            );
            assert_eq!(metadata.methods[0].name(&metadata).unwrap(), "Update");
        }
    }

    #[test]
    fn test_string_at_errors() {
        let mut builder = MetadataBuilder::new(MetadataVersion::new(27.0));
        builder.assembly("Game", "Game.dll");
        let metadata = builder.build().unwrap();

        assert!(metadata.string_at(-1).is_err());
        assert!(metadata.string_at(i32::MAX).is_err());
    }

    #[test]
    fn test_public_key_forms() {
        let mut builder = MetadataBuilder::new(MetadataVersion::new(24.1));
        builder.assembly_with_key("Signed", "Signed.dll", &[0x00, 0x24, 0xAB]);
        let metadata = builder.build().unwrap();
        let key = metadata.assemblies[0].aname.public_key(&metadata).unwrap();
        assert_eq!(key, Some(vec![0x00, 0x24, 0xAB]));

        let mut builder = MetadataBuilder::new(MetadataVersion::new(27.0));
        builder.assembly_with_key("Signed", "Signed.dll", &[0x00, 0x24, 0xAB]);
        let metadata = builder.build().unwrap();
        let key = metadata.assemblies[0].aname.public_key(&metadata).unwrap();
        assert_eq!(key, Some(vec![0x00, 0x24, 0xAB]));
    }
}
