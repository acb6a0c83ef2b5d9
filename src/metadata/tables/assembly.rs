use crate::{
    metadata::{GlobalMetadata, VersionRange},
    Result,
};

metadata_record! {
    /// The identity of an assembly: name, culture, version and public key material.
    pub struct AssemblyNameDefinition {
        /// String heap index of the simple name
        pub name_index: i32,
        /// String heap index of the culture
        pub culture_index: i32,
        /// Removed in 24.15 and again from 24.4 on
        @[VersionRange::until(24.1), VersionRange::between(24.2, 24.3)]
        pub hash_value_index: i32,
        /// String heap or blob index of the public key, depending on the version
        pub public_key_index: i32,
        /// Hash algorithm id
        pub hash_alg: u32,
        /// Hash length
        pub hash_len: i32,
        /// `AssemblyNameFlags`
        pub flags: u32,
        /// Version major
        pub major: i32,
        /// Version minor
        pub minor: i32,
        /// Version build
        pub build: i32,
        /// Version revision
        pub revision: i32,
        /// Public key token as stored (little-endian bytes)
        pub public_key_token: u64,
    }
}

impl AssemblyNameDefinition {
    /// The simple assembly name
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn name<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.name_index)
    }

    /// The culture, usually empty
    ///
    /// # Errors
    /// Returns `Malformed` if the string index is invalid.
    pub fn culture<'a>(&self, metadata: &'a GlobalMetadata) -> Result<&'a str> {
        metadata.string_at(self.culture_index)
    }

    /// The public key bytes, or `None` if the assembly is not strong-named.
    ///
    /// From 24.4 (and in 24.15) the key is a length-prefixed blob. Older versions store it as a
    /// quoted C string literal such as `"\x0\x24\x0..."`, or the literal `NULL`.
    ///
    /// # Errors
    /// Returns `Malformed` if the index is outside of its heap.
    pub fn public_key(&self, metadata: &GlobalMetadata) -> Result<Option<Vec<u8>>> {
        let version = metadata.version();
        if version.is_at_least(24.4) || version.is(24.15) {
            let blob = metadata.blob_at(self.public_key_index)?;
            return Ok((!blob.is_empty()).then(|| blob.to_vec()));
        }

        let literal = metadata.string_at(self.public_key_index)?;
        if literal == "NULL" {
            return Ok(None);
        }

        Ok(literal
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .and_then(parse_escaped_bytes))
    }

    /// The public key token, or `None` if it is zero
    #[must_use]
    pub fn public_key_token(&self) -> Option<[u8; 8]> {
        (self.public_key_token != 0).then(|| self.public_key_token.to_le_bytes())
    }

    /// Version quadruple
    #[must_use]
    pub fn version(&self) -> (i32, i32, i32, i32) {
        (self.major, self.minor, self.build, self.revision)
    }
}

/// Parse a sequence of `\xH` / `\xHH` escapes into bytes.
fn parse_escaped_bytes(text: &str) -> Option<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        rest = rest.strip_prefix("\\x")?;

        let digits = rest
            .bytes()
            .take(2)
            .take_while(u8::is_ascii_hexdigit)
            .count();
        if digits == 0 {
            return None;
        }

        bytes.push(u8::from_str_radix(&rest[..digits], 16).ok()?);
        rest = &rest[digits..];
    }

    Some(bytes)
}

metadata_record! {
    /// An assembly of the application.
    pub struct AssemblyDefinition {
        /// Index of the image holding this assembly's types
        pub image_index: i32,
        /// Metadata token
        @[VersionRange::since(24.1)]
        pub token: u32,
        /// Legacy custom attribute index
        @[VersionRange::until(24.0)]
        pub custom_attribute_index: i32,
        /// Start into the referenced assembly index list
        @[VersionRange::since(20.0)]
        pub referenced_assembly_start: i32,
        /// Number of referenced assemblies
        @[VersionRange::since(20.0)]
        pub referenced_assembly_count: i32,
        /// Identity
        pub aname: AssemblyNameDefinition,
    }
}
