//! Little-endian primitive reading for metadata and native image parsing.
//!
//! Everything IL2CPP produces (the global metadata blob, the registration structures inside
//! the native binary) is little-endian on every supported target, so this module only offers
//! the little-endian half of the usual reader toolbox. All reads are bounds-checked and report
//! [`crate::Error::OutOfBounds`] instead of panicking.
//!
//! # Example
//!
//! ```rust,ignore
//! use il2scope::file::io::{read_le, read_le_at};
//!
//! let data = [0x01, 0x00, 0x00, 0x00, 0xFF];
//! let value: u32 = read_le(&data)?;
//! assert_eq!(value, 1);
//!
//! let mut offset = 4;
//! let byte: u8 = read_le_at(&data, &mut offset)?;
//! assert_eq!((byte, offset), (0xFF, 5));
//! # Ok::<(), il2scope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Primitive values that can be decoded from a fixed number of little-endian bytes.
pub trait ByteIO: Sized {
    /// Fixed-size byte representation of the value
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Build the value from its little-endian byte representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_byte_io {
    ($($ty:ty),*) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a `T` at `offset` and advance `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Read a native pointer-sized unsigned value (4 or 8 bytes) at `offset`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`, or
/// `Malformed` for a pointer width other than 4 or 8.
pub fn read_le_at_ptr(data: &[u8], offset: &mut usize, pointer_size: usize) -> Result<u64> {
    match pointer_size {
        8 => read_le_at::<u64>(data, offset),
        4 => Ok(u64::from(read_le_at::<u32>(data, offset)?)),
        other => Err(malformed_error!("Invalid pointer size - {}", other)),
    }
}
