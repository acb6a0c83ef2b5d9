use super::{Backend, BinaryImage, ExportedSymbol, Memory, Section};
use crate::Result;

/// A raw memory dump of a loaded binary, mapped as a single executable region at `base`.
///
/// Useful for images pulled out of a running process where the container headers are gone,
/// and for building small synthetic images.
pub struct FlatImage {
    data: Box<dyn Backend>,
    pointer_size: usize,
    sections: Vec<Section>,
    exports: Vec<ExportedSymbol>,
}

impl FlatImage {
    /// Map `data` at `base` with the given pointer width
    ///
    /// # Errors
    /// Returns `Malformed` for a pointer width other than 4 or 8.
    pub fn new(data: Vec<u8>, base: u64, pointer_size: usize) -> Result<FlatImage> {
        if pointer_size != 4 && pointer_size != 8 {
            return Err(malformed_error!("Invalid pointer size - {}", pointer_size));
        }

        let len = data.len() as u64;
        Ok(FlatImage {
            data: Box::new(Memory::new(data)),
            pointer_size,
            sections: vec![Section {
                name: ".flat".to_string(),
                virtual_address: base,
                virtual_size: len,
                file_offset: 0,
                file_size: len,
                executable: true,
            }],
            exports: Vec::new(),
        })
    }

    /// Declare an exported symbol at `address`
    #[must_use]
    pub fn with_export(mut self, name: &str, address: u64) -> FlatImage {
        self.exports.push(ExportedSymbol {
            name: name.to_string(),
            address,
        });
        self
    }
}

impl BinaryImage for FlatImage {
    fn data(&self) -> &[u8] {
        self.data.data()
    }

    fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    fn image_base(&self) -> u64 {
        self.sections[0].virtual_address
    }

    fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn exports(&self) -> &[ExportedSymbol] {
        &self.exports
    }
}
