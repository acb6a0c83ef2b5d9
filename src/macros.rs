/// Declare a metadata record whose layout is a versioned, ordered field list.
///
/// Each field may carry `@[range, ...]` with one or more [`crate::metadata::VersionRange`]s.
/// While decoding, a field whose ranges do not contain the active version is skipped
/// entirely: it keeps its default value and the cursor does not move. Fields without
/// ranges are always read. The struct itself may carry `@[...]` to restrict the versions
/// in which the record exists at all.
///
/// Builds with `test` or the `fixtures` feature also get the matching `Encode` impl, used to
/// synthesize metadata blobs.
///
/// ```rust,ignore
/// metadata_record! {
///     /// An example
///     pub struct Example {
///         pub name_index: i32,
///         @[VersionRange::until(24.1), VersionRange::between(24.2, 24.3)]
///         pub hash_value_index: i32,
///     }
/// }
/// ```
macro_rules! metadata_record {
    (
        $(#[$meta:meta])*
        $(@[$($srange:expr),+ $(,)?])?
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $(@[$($range:expr),+ $(,)?])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $name {
            /// Declared field layout, in stream order
            pub const LAYOUT: &'static [crate::metadata::FieldSpec] = &[
                $(
                    crate::metadata::FieldSpec {
                        name: stringify!($field),
                        versions: &[$($($range),+)?],
                    },
                )*
            ];
        }

        impl crate::metadata::Decode for $name {
            const NAME: &'static str = stringify!($name);
            const AVAILABLE: &'static [crate::metadata::VersionRange] = &[$($($srange),+)?];

            fn decode(reader: &mut crate::metadata::MetadataReader<'_>) -> crate::Result<Self> {
                let mut record = Self::default();
                $(
                    if reader.includes(&[$($($range),+)?]) {
                        record.$field = reader.read::<$ty>()?;
                    }
                )*
                Ok(record)
            }

            fn encoded_size(version: crate::metadata::MetadataVersion, pointer_size: usize) -> usize {
                let mut size = 0;
                $(
                    if version.within(&[$($($range),+)?]) {
                        size += <$ty as crate::metadata::Decode>::encoded_size(version, pointer_size);
                    }
                )*
                size
            }
        }

        #[cfg(any(test, feature = "fixtures"))]
        impl crate::metadata::Encode for $name {
            fn encode(&self, version: crate::metadata::MetadataVersion, pointer_size: usize, out: &mut Vec<u8>) {
                $(
                    if version.within(&[$($($range),+)?]) {
                        crate::metadata::Encode::encode(&self.$field, version, pointer_size, out);
                    }
                )*
            }
        }
    };
}
