use crate::binary::Il2CppTypeEnum;

/// Writes custom attribute blobs in the 29+ encoding.
///
/// ```rust,ignore
/// let mut blob = AttributeBlobWriter::new(&[ctor]);
/// blob.counts(1, 0, 0).int32(42);
/// builder.custom_attribute_data(assembly, token, blob.finish());
/// ```
#[derive(Debug, Default, Clone)]
pub struct AttributeBlobWriter {
    data: Vec<u8>,
}

impl AttributeBlobWriter {
    /// Start a blob for attributes constructed by `constructors` (method definition indices)
    #[must_use]
    pub fn new(constructors: &[i32]) -> Self {
        let mut writer = AttributeBlobWriter::default();
        writer.compressed_uint(constructors.len() as u32);
        for &constructor in constructors {
            writer.raw(&(constructor as u32).to_le_bytes());
        }
        writer
    }

    /// Argument, field and property counts of the next attribute
    pub fn counts(&mut self, arguments: u32, fields: u32, properties: u32) -> &mut Self {
        self.compressed_uint(arguments)
            .compressed_uint(fields)
            .compressed_uint(properties)
    }

    /// A type byte
    pub fn tag(&mut self, kind: Il2CppTypeEnum) -> &mut Self {
        self.raw(&[kind as u8])
    }

    /// Raw bytes
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// IL2CPP compressed unsigned integer
    pub fn compressed_uint(&mut self, value: u32) -> &mut Self {
        if value < 0x80 {
            self.data.push(value as u8);
        } else if value < 0x4000 {
            self.data.push(0x80 | (value >> 8) as u8);
            self.data.push(value as u8);
        } else if value < 0x2000_0000 {
            self.data.push(0xC0 | (value >> 24) as u8);
            self.data.push((value >> 16) as u8);
            self.data.push((value >> 8) as u8);
            self.data.push(value as u8);
        } else {
            self.data.push(0xF0);
            self.data.extend_from_slice(&value.to_le_bytes());
        }
        self
    }

    /// IL2CPP compressed signed integer, sign in the low bit
    pub fn compressed_int(&mut self, value: i32) -> &mut Self {
        let encoded = if value >= 0 {
            (value as u32) << 1
        } else {
            ((-(i64::from(value) + 1)) as u32) << 1 | 1
        };
        self.compressed_uint(encoded)
    }

    /// A tagged `int` value
    pub fn int32(&mut self, value: i32) -> &mut Self {
        self.tag(Il2CppTypeEnum::I4).compressed_int(value)
    }

    /// A tagged `bool` value
    pub fn boolean(&mut self, value: bool) -> &mut Self {
        self.tag(Il2CppTypeEnum::Boolean).raw(&[u8::from(value)])
    }

    /// A tagged string value, `None` for null
    pub fn string(&mut self, value: Option<&str>) -> &mut Self {
        self.tag(Il2CppTypeEnum::String).string_payload(value)
    }

    /// An untagged string payload
    pub fn string_payload(&mut self, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self
                .compressed_int(value.len() as i32)
                .raw(value.as_bytes()),
            None => self.compressed_int(-1),
        }
    }

    /// A tagged `System.Type` value, -1 for null
    pub fn type_index(&mut self, type_index: i32) -> &mut Self {
        self.tag(Il2CppTypeEnum::Il2CppTypeIndex)
            .compressed_int(type_index)
    }

    /// Enum tag followed by the enum's registration type index
    pub fn enum_tag(&mut self, enum_type: i32) -> &mut Self {
        self.tag(Il2CppTypeEnum::Enum).compressed_int(enum_type)
    }

    /// Member index of a named argument declared by the attribute type itself
    pub fn own_member(&mut self, index: i32) -> &mut Self {
        self.compressed_int(index)
    }

    /// Member index of a named argument declared by a base type
    pub fn inherited_member(&mut self, index: i32, declaring_type: u32) -> &mut Self {
        self.compressed_int(-(index + 1)).compressed_uint(declaring_type)
    }

    /// The encoded blob
    #[must_use]
    pub fn finish(&self) -> Vec<u8> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::parser::Parser;

    #[test]
    fn test_compressed_encoding_matches_parser() {
        let mut writer = AttributeBlobWriter::default();
        for value in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF, 0x2000_0000] {
            writer.compressed_uint(value);
        }
        for value in [0, 1, -1, 63, -64, 100_000, -100_000] {
            writer.compressed_int(value);
        }

        let data = writer.finish();
        let mut parser = Parser::new(&data);
        for value in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF, 0x2000_0000] {
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
        }
        for value in [0, 1, -1, 63, -64, 100_000, -100_000] {
            assert_eq!(parser.read_compressed_int().unwrap(), value);
        }
        assert!(!parser.has_more_data());
    }
}
