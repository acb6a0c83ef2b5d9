//! Version-aware record decoding.
//!
//! A [`MetadataReader`] couples a [`Parser`] cursor with the [`MetadataVersion`] and native
//! pointer width of one loaded binary. Records implement [`Decode`]; most are declared with
//! `metadata_record!`, which turns a field list annotated with version ranges into a decoder
//! that skips out-of-range fields without advancing the cursor.
//!
//! The version is part of the reader rather than global state, so two binaries with different
//! layouts can be processed side by side.

use crate::{
    file::parser::Parser,
    metadata::{MetadataVersion, VersionRange},
    Error, Result,
};

/// One entry of a record's declared layout.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as declared
    pub name: &'static str,
    /// Versions in which the field is present (empty means always)
    pub versions: &'static [VersionRange],
}

impl FieldSpec {
    /// True if this field is stored in `version`
    #[must_use]
    pub fn is_present(&self, version: MetadataVersion) -> bool {
        version.within(self.versions)
    }
}

/// Something that can be read from a metadata or registration stream.
pub trait Decode: Sized {
    /// Record kind name, for error reporting
    const NAME: &'static str;
    /// Versions in which this record kind exists (empty means always)
    const AVAILABLE: &'static [VersionRange] = &[];

    /// Decode one value at the reader's cursor
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends mid-record.
    fn decode(reader: &mut MetadataReader<'_>) -> Result<Self>;

    /// Number of bytes one value occupies in `version`
    fn encoded_size(version: MetadataVersion, pointer_size: usize) -> usize;
}

macro_rules! impl_decode_primitive {
    ($($ty:ty),*) => {
        $(
            impl Decode for $ty {
                const NAME: &'static str = stringify!($ty);

                fn decode(reader: &mut MetadataReader<'_>) -> Result<Self> {
                    reader.parser.read_le::<$ty>()
                }

                fn encoded_size(_version: MetadataVersion, _pointer_size: usize) -> usize {
                    std::mem::size_of::<$ty>()
                }
            }
        )*
    };
}

impl_decode_primitive!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Inverse of [`Decode`], writing the in-range fields only.
#[cfg(any(test, feature = "fixtures"))]
pub trait Encode {
    /// Append the encoded value to `out`
    fn encode(&self, version: MetadataVersion, pointer_size: usize, out: &mut Vec<u8>);
}

#[cfg(any(test, feature = "fixtures"))]
macro_rules! impl_encode_primitive {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, _version: MetadataVersion, _pointer_size: usize, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

#[cfg(any(test, feature = "fixtures"))]
impl_encode_primitive!(u8, i8, u16, i16, u32, i32, u64, i64);

/// A native pointer or `size_t`, whose width depends on the target binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativePtr(pub u64);

impl NativePtr {
    /// True for a null pointer
    #[must_use]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The value as an element count
    ///
    /// # Errors
    /// Returns `Malformed` if the value does not fit into `usize`.
    pub fn as_count(self) -> Result<usize> {
        usize::try_from(self.0).map_err(|_| malformed_error!("Invalid native count - {}", self.0))
    }
}

impl Decode for NativePtr {
    const NAME: &'static str = "NativePtr";

    fn decode(reader: &mut MetadataReader<'_>) -> Result<Self> {
        let pointer_size = reader.pointer_size;
        Ok(NativePtr(reader.parser.read_ptr(pointer_size)?))
    }

    fn encoded_size(_version: MetadataVersion, pointer_size: usize) -> usize {
        pointer_size
    }
}

#[cfg(any(test, feature = "fixtures"))]
impl Encode for NativePtr {
    fn encode(&self, _version: MetadataVersion, pointer_size: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_le_bytes()[..pointer_size]);
    }
}

/// A cursor that decodes records for one fixed metadata version.
pub struct MetadataReader<'a> {
    parser: Parser<'a>,
    version: MetadataVersion,
    pointer_size: usize,
}

impl<'a> MetadataReader<'a> {
    /// Create a reader over `data` for `version`, assuming 64-bit native pointers
    #[must_use]
    pub fn new(data: &'a [u8], version: MetadataVersion) -> Self {
        MetadataReader {
            parser: Parser::new(data),
            version,
            pointer_size: 8,
        }
    }

    /// Set the native pointer width used for [`NativePtr`] fields
    #[must_use]
    pub fn with_pointer_size(mut self, pointer_size: usize) -> Self {
        self.pointer_size = pointer_size;
        self
    }

    /// Wrap an already positioned parser
    #[must_use]
    pub fn from_parser(parser: Parser<'a>, version: MetadataVersion, pointer_size: usize) -> Self {
        MetadataReader {
            parser,
            version,
            pointer_size,
        }
    }

    /// The version every decision of this reader is gated on
    #[must_use]
    pub fn version(&self) -> MetadataVersion {
        self.version
    }

    /// Native pointer width in bytes
    #[must_use]
    pub fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    /// Current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.parser.pos()
    }

    /// Move the cursor
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        self.parser.seek(pos)
    }

    /// Direct access to the underlying cursor
    pub fn parser(&mut self) -> &mut Parser<'a> {
        &mut self.parser
    }

    /// True if a field annotated with `ranges` is stored in the active version
    #[must_use]
    pub fn includes(&self, ranges: &[VersionRange]) -> bool {
        self.version.within(ranges)
    }

    /// Decode one `T` at the cursor
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedRecord`] if `T` does not exist in this version, or
    /// [`crate::Error::OutOfBounds`] if the stream ends mid-record.
    pub fn read<T: Decode>(&mut self) -> Result<T> {
        if !self.version.within(T::AVAILABLE) {
            return Err(Error::UnsupportedRecord {
                record: T::NAME,
                version: self.version,
            });
        }
        T::decode(self)
    }

    /// Decode `count` consecutive `T`s
    ///
    /// # Errors
    /// Fails on the first record that cannot be decoded; no partial result is returned.
    pub fn read_array<T: Decode>(&mut self, count: usize) -> Result<Vec<T>> {
        let record_size = T::encoded_size(self.version, self.pointer_size);
        if record_size.saturating_mul(count) > self.parser.remaining() {
            return Err(out_of_bounds_error!());
        }

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(self.read::<T>()?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    metadata_record! {
        /// A record with the same gaps as an assembly name
        struct Gapped {
            name_index: i32,
            culture_index: i32,
            @[VersionRange::until(24.1), VersionRange::between(24.2, 24.3)]
            hash_value_index: i32,
            public_key_index: i32,
            @[VersionRange::since(27.0)]
            flags: u16,
        }
    }

    metadata_record! {
        @[VersionRange::since(29.0)]
        struct NewOnly {
            token: u32,
        }
    }

    fn stream() -> Vec<u8> {
        let mut data = Vec::new();
        for value in [1_i32, 2, 3, 4, 5] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_field_present() {
        let data = stream();
        let mut reader = MetadataReader::new(&data, MetadataVersion::new(24.1));
        let record = reader.read::<Gapped>().unwrap();

        assert_eq!(record.name_index, 1);
        assert_eq!(record.culture_index, 2);
        assert_eq!(record.hash_value_index, 3);
        assert_eq!(record.public_key_index, 4);
        assert_eq!(record.flags, 0);
        assert_eq!(reader.pos(), 16);
    }

    #[test]
    fn test_field_skipped_without_gap() {
        let data = stream();

        for version in [24.15, 24.4, 27.0] {
            let mut reader = MetadataReader::new(&data, MetadataVersion::new(version));
            let record = reader.read::<Gapped>().unwrap();

            assert_eq!(record.culture_index, 2);
            assert_eq!(record.hash_value_index, 0, "skipped at {version}");
            assert_eq!(record.public_key_index, 3, "read right after culture at {version}");
        }

        let mut reader = MetadataReader::new(&data, MetadataVersion::new(27.0));
        reader.read::<Gapped>().unwrap();
        assert_eq!(reader.pos(), 14);
        assert_eq!(Gapped::encoded_size(MetadataVersion::new(27.0), 8), 14);
        assert_eq!(Gapped::encoded_size(MetadataVersion::new(24.2), 8), 16);
    }

    #[test]
    fn test_deterministic() {
        let data = stream();
        let version = MetadataVersion::new(24.15);

        let first = MetadataReader::new(&data, version).read::<Gapped>().unwrap();
        let second = MetadataReader::new(&data, version).read::<Gapped>().unwrap();
        assert_eq!(first, second);

        let other = MetadataReader::new(&data, MetadataVersion::new(24.2))
            .read::<Gapped>()
            .unwrap();
        assert_eq!(first.name_index, other.name_index);
        assert_eq!(first.culture_index, other.culture_index);
    }

    #[test]
    fn test_layout() {
        assert_eq!(Gapped::LAYOUT.len(), 5);
        assert_eq!(Gapped::LAYOUT[2].name, "hash_value_index");
        assert!(!Gapped::LAYOUT[2].is_present(MetadataVersion::new(24.15)));
        assert!(Gapped::LAYOUT[0].is_present(MetadataVersion::new(24.15)));
    }

    #[test]
    fn test_unsupported_record() {
        let data = stream();
        let mut reader = MetadataReader::new(&data, MetadataVersion::new(27.0));
        assert!(matches!(
            reader.read::<NewOnly>(),
            Err(Error::UnsupportedRecord { record: "NewOnly", .. })
        ));

        let mut reader = MetadataReader::new(&data, MetadataVersion::new(29.0));
        assert_eq!(reader.read::<NewOnly>().unwrap().token, 1);
    }

    #[test]
    fn test_truncated_record() {
        let data = [0u8; 10];
        let mut reader = MetadataReader::new(&data, MetadataVersion::new(24.1));
        assert!(matches!(reader.read::<Gapped>(), Err(Error::OutOfBounds)));

        let mut reader = MetadataReader::new(&data, MetadataVersion::new(24.1));
        assert!(reader.read_array::<u32>(3).is_err());
        assert_eq!(reader.read_array::<u16>(5).unwrap().len(), 5);
    }

    #[test]
    fn test_encode_matches_layout() {
        let record = Gapped {
            name_index: 7,
            culture_index: 8,
            hash_value_index: 9,
            public_key_index: 10,
            flags: 11,
        };

        let mut out = Vec::new();
        record.encode(MetadataVersion::new(24.4), 8, &mut out);
        assert_eq!(out.len(), Gapped::encoded_size(MetadataVersion::new(24.4), 8));

        let decoded = MetadataReader::new(&out, MetadataVersion::new(24.4))
            .read::<Gapped>()
            .unwrap();
        assert_eq!(decoded.public_key_index, 10);
        assert_eq!(decoded.hash_value_index, 0);
    }

    #[test]
    fn test_native_ptr() {
        let data = 0x1122_3344_5566_7788_u64.to_le_bytes();

        let mut reader = MetadataReader::new(&data, MetadataVersion::new(27.0));
        assert_eq!(reader.read::<NativePtr>().unwrap().0, 0x1122_3344_5566_7788);

        let mut reader =
            MetadataReader::new(&data, MetadataVersion::new(27.0)).with_pointer_size(4);
        assert_eq!(reader.read::<NativePtr>().unwrap().0, 0x5566_7788);
        assert_eq!(reader.pos(), 4);
    }
}
