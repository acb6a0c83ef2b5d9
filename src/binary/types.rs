//! Native `Il2CppType` records.

use strum::{Display, EnumCount, EnumIter, FromRepr};

use crate::{file::parser::Parser, metadata::MetadataVersion, Result};

/// The element-type tag of an `Il2CppType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter, FromRepr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Il2CppTypeEnum {
    End = 0x00,
    Void = 0x01,
    Boolean = 0x02,
    Char = 0x03,
    I1 = 0x04,
    U1 = 0x05,
    I2 = 0x06,
    U2 = 0x07,
    I4 = 0x08,
    U4 = 0x09,
    I8 = 0x0a,
    U8 = 0x0b,
    R4 = 0x0c,
    R8 = 0x0d,
    String = 0x0e,
    Ptr = 0x0f,
    ByRef = 0x10,
    ValueType = 0x11,
    Class = 0x12,
    Var = 0x13,
    Array = 0x14,
    GenericInst = 0x15,
    TypedByRef = 0x16,
    I = 0x18,
    U = 0x19,
    FnPtr = 0x1b,
    Object = 0x1c,
    SzArray = 0x1d,
    MVar = 0x1e,
    CModReqd = 0x1f,
    CModOpt = 0x20,
    Internal = 0x21,
    Modifier = 0x40,
    Sentinel = 0x41,
    Pinned = 0x45,
    /// Enum marker inside custom attribute blobs
    Enum = 0x55,
    /// "Type given by index" marker inside custom attribute blobs
    Il2CppTypeIndex = 0xff,
}

impl Il2CppTypeEnum {
    /// Decode a raw tag byte
    ///
    /// # Errors
    /// Returns `Malformed` for unknown tags.
    pub fn from_byte(value: u8) -> Result<Self> {
        Self::from_repr(value).ok_or_else(|| malformed_error!("Invalid Il2CppTypeEnum - 0x{:02X}", value))
    }

    /// True for the numeric, boolean and char tags
    #[must_use]
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Char
                | Self::I1
                | Self::U1
                | Self::I2
                | Self::U2
                | Self::I4
                | Self::U4
                | Self::I8
                | Self::U8
                | Self::R4
                | Self::R8
                | Self::I
                | Self::U
        )
    }
}

/// The union payload of an `Il2CppType`, normalized to registration indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeData {
    /// Class, value type, primitive, `Void` and `String` tags: a type definition index
    TypeDefinition(i32),
    /// `Var` / `MVar`: a generic parameter index
    GenericParameter(i32),
    /// `Ptr` / `SzArray`: the element type, as an index into [`super::Registration::types`]
    Element(usize),
    /// `Array`: element type plus rank
    Array {
        /// Element type index
        element: usize,
        /// Number of dimensions
        rank: u8,
    },
    /// `GenericInst`: index into [`super::Registration::generic_classes`]
    GenericClass(usize),
    /// Tags without payload (`FnPtr`, `End`)
    None,
}

/// A decoded `Il2CppType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Il2CppType {
    /// Normalized payload
    pub data: TypeData,
    /// Field / parameter attribute flags of the use site
    pub attrs: u16,
    /// Element-type tag
    pub kind: Il2CppTypeEnum,
    /// Number of custom modifiers
    pub num_mods: u8,
    /// Passed by reference
    pub byref: bool,
    /// Pinned local
    pub pinned: bool,
    /// Value type flag (27.2+)
    pub valuetype: bool,
}

/// An `Il2CppType` as stored, before its pointer payload has been resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawType {
    pub data: u64,
    pub attrs: u16,
    pub kind: Il2CppTypeEnum,
    pub num_mods: u8,
    pub byref: bool,
    pub pinned: bool,
    pub valuetype: bool,
}

impl RawType {
    /// Read `{ data, attrs:16, type:8, num_mods, byref, pinned[, valuetype] }`.
    ///
    /// From 27.2 the modifier count shrinks to 5 bits to make room for the value type bit.
    pub(crate) fn read(
        parser: &mut Parser<'_>,
        version: MetadataVersion,
        pointer_size: usize,
    ) -> Result<RawType> {
        let data = parser.read_ptr(pointer_size)?;
        let attrs = parser.read_le::<u16>()?;
        let kind = Il2CppTypeEnum::from_byte(parser.read_le::<u8>()?)?;
        let bits = parser.read_le::<u8>()?;

        let (num_mods, byref, pinned, valuetype) = if version.is_at_least(27.2) {
            (bits & 0x1F, bits & 0x20 != 0, bits & 0x40 != 0, bits & 0x80 != 0)
        } else {
            (bits & 0x3F, bits & 0x40 != 0, bits & 0x80 != 0, false)
        };

        Ok(RawType {
            data,
            attrs,
            kind,
            num_mods,
            byref,
            pinned,
            valuetype,
        })
    }

    pub(crate) fn resolve(self, data: TypeData) -> Il2CppType {
        Il2CppType {
            data,
            attrs: self.attrs,
            kind: self.kind,
            num_mods: self.num_mods,
            byref: self.byref,
            pinned: self.pinned,
            valuetype: self.valuetype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_type_enum_repr() {
        assert_eq!(Il2CppTypeEnum::from_byte(0x08).unwrap(), Il2CppTypeEnum::I4);
        assert_eq!(Il2CppTypeEnum::from_byte(0x55).unwrap(), Il2CppTypeEnum::Enum);
        assert!(Il2CppTypeEnum::from_byte(0x17).is_err());

        for kind in Il2CppTypeEnum::iter() {
            assert_eq!(Il2CppTypeEnum::from_byte(kind as u8).unwrap(), kind);
        }
        assert_eq!(Il2CppTypeEnum::COUNT, 37);
    }

    #[test]
    fn test_raw_type_bitfield() {
        let mut bytes = vec![0u8; 8];
        bytes[0] = 0x2A;
        bytes.extend_from_slice(&0x0006_u16.to_le_bytes());
        bytes.push(0x12);
        bytes.push(0x40);

        let mut parser = Parser::new(&bytes);
        let old = RawType::read(&mut parser, MetadataVersion::new(24.5), 8).unwrap();
        assert_eq!(old.data, 0x2A);
        assert_eq!(old.kind, Il2CppTypeEnum::Class);
        assert_eq!(old.attrs, 6);
        assert!(old.byref);
        assert!(!old.pinned);

        let mut parser = Parser::new(&bytes);
        let new = RawType::read(&mut parser, MetadataVersion::new(29.0), 8).unwrap();
        assert!(!new.byref);
        assert!(new.pinned);
        assert!(!new.valuetype);
    }
}
