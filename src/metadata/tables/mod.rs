//! Raw metadata tables.
//!
//! Each table is a flat array of records read once from the global metadata blob. Records are
//! plain data holding indices into the string heap or into other tables; they are never
//! modified after reading. The analysis contexts keep references to individual rows, and
//! [`MetadataTable::index_of`] maps such a reference back to its row number.

mod assembly;
mod attributes;
mod event;
mod field;
mod generics;
mod image;
mod method;
mod parameter;
mod property;
mod typedef;

pub use assembly::{AssemblyDefinition, AssemblyNameDefinition};
pub use attributes::{AttributeDataRange, AttributeTypeRange};
pub use event::EventDefinition;
pub use field::FieldDefinition;
pub use generics::{GenericContainer, GenericParameter};
pub use image::ImageDefinition;
pub use method::MethodDefinition;
pub use parameter::ParameterDefinition;
pub use property::PropertyDefinition;
pub use typedef::TypeDefinition;

use std::ops::Index;

use crate::Result;

/// An immutable, indexable array of decoded records.
#[derive(Debug, Clone)]
pub struct MetadataTable<T> {
    rows: Vec<T>,
}

impl<T> MetadataTable<T> {
    /// Wrap decoded rows
    #[must_use]
    pub fn new(rows: Vec<T>) -> Self {
        MetadataTable { rows }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a row by a metadata index; negative indices are the "none" sentinel
    pub fn get(&self, index: i32) -> Option<&T> {
        usize::try_from(index).ok().and_then(|i| self.rows.get(i))
    }

    /// The rows `[start, start + count)`, as used by type definitions for their members
    ///
    /// # Errors
    /// Returns `Malformed` if the range is negative or exceeds the table.
    pub fn range(&self, start: i32, count: usize) -> Result<&[T]> {
        if count == 0 {
            return Ok(&[]);
        }

        let Ok(start) = usize::try_from(start) else {
            return Err(malformed_error!("Negative table start {} for {} rows", start, count));
        };

        match start.checked_add(count) {
            Some(end) if end <= self.rows.len() => Ok(&self.rows[start..end]),
            _ => Err(malformed_error!(
                "Table range {}+{} exceeds {} rows",
                start,
                count,
                self.rows.len()
            )),
        }
    }

    /// Iterate all rows
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    /// All rows as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.rows
    }

    /// Recover the row number of a reference into this table.
    ///
    /// Identity is positional: a structurally equal record that lives elsewhere (a clone, or a
    /// row of another blob) is not part of this table and yields `None`.
    pub fn index_of(&self, row: &T) -> Option<usize> {
        let size = std::mem::size_of::<T>();
        if size == 0 {
            return None;
        }

        let base = self.rows.as_ptr() as usize;
        let address = std::ptr::from_ref(row) as usize;
        let end = base + self.rows.len() * size;

        if address < base || address >= end || (address - base) % size != 0 {
            return None;
        }

        Some((address - base) / size)
    }
}

impl<T> Index<usize> for MetadataTable<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.rows[index]
    }
}

impl<'a, T> IntoIterator for &'a MetadataTable<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_identity() {
        let table = MetadataTable::new(vec![10_u32, 20, 30]);

        assert_eq!(table.index_of(&table[0]), Some(0));
        assert_eq!(table.index_of(&table[2]), Some(2));

        let copy = table[1];
        assert_eq!(table.index_of(&copy), None);
    }

    #[test]
    fn test_get_and_range() {
        let table = MetadataTable::new(vec![1_i32, 2, 3, 4]);

        assert_eq!(table.get(-1), None);
        assert_eq!(table.get(3), Some(&4));
        assert_eq!(table.get(4), None);

        assert_eq!(table.range(1, 2).unwrap(), &[2, 3]);
        assert!(table.range(-1, 0).unwrap().is_empty());
        assert!(table.range(3, 2).is_err());
        assert!(table.range(-1, 1).is_err());
    }
}
