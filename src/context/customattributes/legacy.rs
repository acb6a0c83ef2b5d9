//! Attribute type lists of metadata before 29.
use std::sync::Arc;

use crate::{
    context::{assembly::AssemblyContext, loader::index_slice, typesystem::TypeContextRc},
    metadata::tables::AttributeTypeRange,
    Error, Result,
};

pub(super) fn attribute_types(
    assembly: &Arc<AssemblyContext>,
    token: u32,
    legacy_index: i32,
) -> Result<Vec<TypeContextRc>> {
    let app = assembly.app()?;
    let metadata = app.metadata();
    let version = metadata.version();
    if version.is_at_least(29.0) {
        return Err(Error::NotSupported);
    }

    let range: Option<&AttributeTypeRange> = if version.is_less_than(24.1) {
        metadata.attribute_type_ranges.get(legacy_index)
    } else {
        let image = assembly.image();
        let ranges = metadata
            .attribute_type_ranges
            .range(image.custom_attribute_start, image.custom_attribute_count as usize)?;
        ranges
            .binary_search_by_key(&token, |range| range.token)
            .ok()
            .map(|found| &ranges[found])
    };

    let Some(range) = range else {
        return Ok(Vec::new());
    };

    let count = usize::try_from(range.count)
        .map_err(|_| malformed_error!("Negative attribute count - {}", range.count))?;
    index_slice(&metadata.attribute_types, range.start, count)?
        .iter()
        .map(|&type_index| assembly.resolve_il2cpp_type(type_index))
        .collect()
}
