//! Access to the native code of methods.

use std::sync::Arc;

use crate::{binary::Registration, context::members::MethodContext, BinaryImage, Error, Result};

/// A backend that can produce the machine code of a method.
///
/// Decoders for individual architectures implement this to hand their own view of the code
/// to the context graph; the graph only stores the returned bytes.
pub trait InstructionSet: Send + Sync {
    /// The raw code bytes starting at the method's native entry point.
    ///
    /// `is_generic_variant` asks the backend for a shared generic variant body instead of the
    /// method's own entry point. The context graph always passes `false`, since the
    /// [`MethodContext::underlying_pointer`] of a concrete generic method already is its
    /// variant pointer.
    ///
    /// # Errors
    /// Returns [`Error::CodeFetch`] if the entry point is not mapped.
    fn raw_bytes_for_method(&self, method: &MethodContext, is_generic_variant: bool) -> Result<Vec<u8>>;
}

/// Slices method bodies out of a binary image.
///
/// IL2CPP binaries carry no function sizes, so a body is assumed to extend up to the next known
/// function start, or to the end of its section.
pub struct ImageInstructionSet {
    image: Arc<dyn BinaryImage>,
    function_starts: Vec<u64>,
}

impl ImageInstructionSet {
    /// Collect every method and generic method pointer of `registration` as function starts
    #[must_use]
    pub fn new(image: Arc<dyn BinaryImage>, registration: &Registration) -> Self {
        let mut function_starts: Vec<u64> = registration
            .method_pointers
            .iter()
            .chain(registration.generic_method_pointers.iter())
            .chain(
                registration
                    .code_gen_modules
                    .iter()
                    .flat_map(|module| module.method_pointers.iter()),
            )
            .copied()
            .filter(|&pointer| pointer != 0)
            .collect();
        function_starts.sort_unstable();
        function_starts.dedup();

        ImageInstructionSet {
            image,
            function_starts,
        }
    }

    /// The code bytes from `address` up to the next function start or section end
    ///
    /// # Errors
    /// Returns [`Error::CodeFetch`] if `address` is not inside a file-backed section.
    pub fn bytes_at(&self, address: u64) -> Result<Vec<u8>> {
        let section = self
            .image
            .section_for_va(address)
            .ok_or_else(|| Error::CodeFetch {
                address,
                reason: "address is not mapped to any section".to_string(),
            })?;

        let next = self
            .function_starts
            .partition_point(|&start| start <= address);
        let end = self
            .function_starts
            .get(next)
            .copied()
            .unwrap_or(u64::MAX)
            .min(section.file_end_va());

        let offset = self.image.va_to_offset(address).map_err(|e| Error::CodeFetch {
            address,
            reason: e.to_string(),
        })?;
        let len = usize::try_from(end - address).map_err(|_| Error::CodeFetch {
            address,
            reason: "method body does not fit into memory".to_string(),
        })?;

        self.image
            .data()
            .get(offset..offset + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::CodeFetch {
                address,
                reason: format!("{len} bytes at offset 0x{offset:X} exceed the image"),
            })
    }
}

impl InstructionSet for ImageInstructionSet {
    fn raw_bytes_for_method(&self, method: &MethodContext, _is_generic_variant: bool) -> Result<Vec<u8>> {
        self.bytes_at(method.underlying_pointer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binary::CodeGenModule, FlatImage};

    #[test]
    fn test_bodies_end_at_next_start() {
        let image: Arc<dyn BinaryImage> =
            Arc::new(FlatImage::new((0u8..0x40).collect(), 0x1000, 8).unwrap());
        let registration = Registration {
            code_gen_modules: vec![CodeGenModule {
                name: "Game.dll".to_string(),
                method_pointers: vec![0x1010, 0, 0x1000],
            }],
            generic_method_pointers: vec![0x1030],
            ..Registration::default()
        };
        let isa = ImageInstructionSet::new(image, &registration);

        assert_eq!(isa.bytes_at(0x1000).unwrap(), (0u8..0x10).collect::<Vec<_>>());
        assert_eq!(isa.bytes_at(0x1010).unwrap().len(), 0x20);
        assert_eq!(isa.bytes_at(0x1030).unwrap(), (0x30u8..0x40).collect::<Vec<_>>());
        assert!(matches!(
            isa.bytes_at(0x2000),
            Err(Error::CodeFetch { address: 0x2000, .. })
        ));
    }
}
