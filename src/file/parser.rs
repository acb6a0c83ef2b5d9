//! Cursor-style binary parser over a borrowed byte slice.
//!
//! [`Parser`] is the single reading primitive used for the metadata blob, the native
//! registration structures and custom attribute blobs. It tracks a position, reads
//! little-endian primitives via [`crate::file::io::ByteIO`], and implements the variable
//! length integer encoding IL2CPP uses inside attribute blobs.
//!
//! # Example
//!
//! ```rust,ignore
//! use il2scope::Parser;
//!
//! let data = [0x81, 0x02, 0x03];
//! let mut parser = Parser::new(&data);
//! assert_eq!(parser.read_compressed_uint()?, 0x102);
//! assert_eq!(parser.read_compressed_int()?, -2);
//! # Ok::<(), il2scope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, read_le_at_ptr, ByteIO},
    Result,
};

/// A generic binary data parser for IL2CPP structures.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if there are bytes left to read
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes between the cursor and the end of the data
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor to `pos`. Seeking to the exact end is allowed (empty tables).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if this would move past the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Access the whole underlying data
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without moving the cursor
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(self.data[self.position])
    }

    /// Run `f`, restoring the cursor if it fails
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Read a little-endian primitive and advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a native pointer of `pointer_size` bytes, widened to `u64`
    ///
    /// # Errors
    /// Returns an error if not enough bytes remain or the size is not 4 or 8.
    pub fn read_ptr(&mut self, pointer_size: usize) -> Result<u64> {
        read_le_at_ptr(self.data, &mut self.position, pointer_size)
    }

    /// Borrow the next `len` bytes and advance past them
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }

    /// Read a variable-length unsigned integer in IL2CPP's encoding.
    ///
    /// Besides the 1/2/4 byte prefixes, `0xF0` introduces a raw 4-byte value while `0xFE` and
    /// `0xFF` stand for `u32::MAX - 1` and `u32::MAX`.
    ///
    /// # Errors
    /// Returns an error on truncated input or an unknown prefix byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        match first_byte {
            0xF0 => self.read_le::<u32>(),
            0xFE => Ok(u32::MAX - 1),
            0xFF => Ok(u32::MAX),
            _ => Err(malformed_error!("Invalid compressed uint - {}", first_byte)),
        }
    }

    /// Read a variable-length signed integer; the low bit of the unsigned form carries the sign.
    ///
    /// # Errors
    /// Returns an error on truncated input or an unknown prefix byte.
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let unsigned = self.read_compressed_uint()?;
        if unsigned == u32::MAX {
            return Ok(i32::MIN);
        }

        #[allow(clippy::cast_possible_wrap)]
        let magnitude = (unsigned >> 1) as i32;
        if (unsigned & 1) == 0 {
            Ok(magnitude)
        } else {
            Ok(-magnitude - 1)
        }
    }

    /// Read `len` bytes and interpret them as UTF-8
    ///
    /// # Errors
    /// Returns an error if not enough bytes remain or they are not valid UTF-8.
    pub fn read_string_utf8_len(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(malformed_error!("Invalid UTF-8 string of length {}", len)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_uint() {
        let test_cases = vec![
            (vec![0x03], 3),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x80], 0x80),
            (vec![0xBF, 0xFF], 0x3FFF),
            (vec![0xC0, 0x00, 0x40, 0x00], 0x4000),
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
            (vec![0xF0, 0x78, 0x56, 0x34, 0x12], 0x1234_5678),
            (vec![0xFE], u32::MAX - 1),
            (vec![0xFF], u32::MAX),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            let result = parser.read_compressed_uint().unwrap();
            assert_eq!(result, expected, "input {input:02X?}");
            assert!(!parser.has_more_data());
        }
    }

    #[test]
    fn test_compressed_uint_invalid() {
        let mut parser = Parser::new(&[0xF8]);
        assert!(parser.read_compressed_uint().is_err());

        let mut parser = Parser::new(&[0x80]);
        assert!(parser.read_compressed_uint().is_err());
    }

    #[test]
    fn test_compressed_int() {
        let test_cases = vec![
            (vec![0x00], 0),
            (vec![0x02], 1),
            (vec![0x01], -1),
            (vec![0x03], -2),
            (vec![0x80, 0xC8], 100),
            (vec![0xFF], i32::MIN),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_int().unwrap(), expected);
        }
    }

    #[test]
    fn test_seek_and_advance() {
        let data = [0u8; 8];
        let mut parser = Parser::new(&data);

        parser.seek(8).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(9).is_err());

        parser.seek(2).unwrap();
        parser.advance_by(3).unwrap();
        assert_eq!(parser.pos(), 5);
        assert_eq!(parser.remaining(), 3);
        assert!(parser.advance_by(4).is_err());
        assert_eq!(parser.pos(), 5);
    }

    #[test]
    fn test_transactional_restores() {
        let data = [0x01, 0x02];
        let mut parser = Parser::new(&data);

        let result = parser.transactional(|p| {
            p.read_le::<u8>()?;
            p.read_le::<u32>()
        });
        assert!(result.is_err());
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn test_read_bytes_and_string() {
        let data = b"abcdef";
        let mut parser = Parser::new(data);
        assert_eq!(parser.read_bytes(2).unwrap(), b"ab");
        assert_eq!(parser.read_string_utf8_len(3).unwrap(), "cde");
        assert!(parser.read_string_utf8_len(2).is_err());
    }
}
