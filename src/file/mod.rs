//! Native image access for IL2CPP binaries.
//!
//! The analysis model never parses machine code itself; it only needs byte-addressable access
//! to the compiled game binary: raw bytes, virtual address translation, the section list and
//! the exported symbols. Those requirements are captured by [`BinaryImage`], with two
//! implementations:
//!
//! - [`File`] - PE, ELF or Mach-O images parsed with `goblin`
//! - [`FlatImage`] - raw memory dumps loaded at a known base address
//!
//! Both store their bytes behind a [`Backend`], either an owned buffer or a memory mapped
//! file.
//!
//! # Example
//!
//! ```rust,no_run
//! use il2scope::{BinaryImage, File};
//!
//! let file = File::from_file("GameAssembly.dll")?;
//! for section in file.sections() {
//!     println!("{:<8} 0x{:X}", section.name, section.virtual_address);
//! }
//! let offset = file.va_to_offset(file.image_base() + 0x1000)?;
//! # Ok::<(), il2scope::Error>(())
//! ```

pub mod io;
pub mod parser;

mod flat;
pub(crate) mod memory;
pub(crate) mod physical;

pub use flat::FlatImage;

use std::path::Path;

use goblin::{
    elf::{
        program_header::{PF_X, PT_LOAD},
        section_header::{SHF_ALLOC, SHF_EXECINSTR, SHT_NOBITS},
    },
    mach::Mach,
    Object,
};
pub(crate) use memory::Memory;
use parser::Parser;
pub(crate) use physical::Physical;

use crate::{
    Error::{Empty, NotSupported},
    Result,
};

/// Backend for raw image bytes.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data().get(offset..end))
            .ok_or(out_of_bounds_error!())
    }
}

/// Container format of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Windows Portable Executable (`GameAssembly.dll`)
    Pe,
    /// ELF shared object (`libil2cpp.so`)
    Elf,
    /// Mach-O binary (iOS / macOS)
    MachO,
    /// Raw memory dump
    Flat,
}

/// A mapped region of the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section or segment name
    pub name: String,
    /// Absolute virtual address of the first byte
    pub virtual_address: u64,
    /// Size of the region once loaded
    pub virtual_size: u64,
    /// File offset of the first byte
    pub file_offset: u64,
    /// Number of bytes backed by the file
    pub file_size: u64,
    /// Whether the region holds executable code
    pub executable: bool,
}

impl Section {
    /// Returns true if `va` is backed by file data in this section
    #[must_use]
    pub fn contains_va(&self, va: u64) -> bool {
        va >= self.virtual_address && va - self.virtual_address < self.file_size
    }

    /// Returns true if `offset` lies in the file data of this section
    #[must_use]
    pub fn contains_offset(&self, offset: u64) -> bool {
        offset >= self.file_offset && offset - self.file_offset < self.file_size
    }

    /// Absolute virtual address one past the file-backed data
    #[must_use]
    pub fn file_end_va(&self) -> u64 {
        self.virtual_address.saturating_add(self.file_size)
    }
}

/// A symbol exported by the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSymbol {
    /// Undecorated symbol name
    pub name: String,
    /// Absolute virtual address
    pub address: u64,
}

/// Byte-addressable view of a compiled IL2CPP binary.
pub trait BinaryImage: Send + Sync {
    /// The complete raw image bytes
    fn data(&self) -> &[u8];

    /// Native pointer width in bytes (4 or 8)
    fn pointer_size(&self) -> usize;

    /// Preferred load address of the image
    fn image_base(&self) -> u64;

    /// All mapped sections
    fn sections(&self) -> &[Section];

    /// All exported symbols
    fn exports(&self) -> &[ExportedSymbol];

    /// Translate an absolute virtual address into a file offset
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no section backs `va`.
    fn va_to_offset(&self, va: u64) -> Result<usize> {
        let Some(section) = self.sections().iter().find(|s| s.contains_va(va)) else {
            return Err(out_of_bounds_error!());
        };

        usize::try_from(section.file_offset + (va - section.virtual_address))
            .map_err(|_| out_of_bounds_error!())
    }

    /// Translate a file offset into an absolute virtual address
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no section covers `offset`.
    fn offset_to_va(&self, offset: usize) -> Result<u64> {
        let offset = offset as u64;
        let Some(section) = self.sections().iter().find(|s| s.contains_offset(offset)) else {
            return Err(out_of_bounds_error!());
        };

        Ok(section.virtual_address + (offset - section.file_offset))
    }

    /// The section whose file data contains `va`
    fn section_for_va(&self, va: u64) -> Option<&Section> {
        self.sections().iter().find(|s| s.contains_va(va))
    }

    /// Look up an exported symbol by name
    fn export(&self, name: &str) -> Option<&ExportedSymbol> {
        self.exports().iter().find(|e| e.name == name)
    }

    /// A [`Parser`] over the raw bytes, positioned at `va`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `va` is not mapped.
    fn parser_at(&self, va: u64) -> Result<Parser<'_>> {
        let offset = self.va_to_offset(va)?;
        let mut parser = Parser::new(self.data());
        parser.seek(offset)?;
        Ok(parser)
    }

    /// Read a native pointer stored at `va`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `va` is not mapped.
    fn read_ptr_at(&self, va: u64) -> Result<u64> {
        self.parser_at(va)?.read_ptr(self.pointer_size())
    }
}

/// A compiled IL2CPP binary loaded from disk or memory.
pub struct File {
    data: Box<dyn Backend>,
    format: ImageFormat,
    image_base: u64,
    pointer_size: usize,
    sections: Vec<Section>,
    exports: Vec<ExportedSymbol>,
}

impl File {
    /// Load and parse an image from disk, memory mapping it
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or is not a PE, ELF or thin Mach-O image.
    pub fn from_file(path: impl AsRef<Path>) -> Result<File> {
        Self::load(Box::new(Physical::new(path)?))
    }

    /// Parse an image from an owned buffer
    ///
    /// # Errors
    /// Returns an error if the data is not a PE, ELF or thin Mach-O image.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::load(Box::new(Memory::new(data)))
    }

    fn load(data: Box<dyn Backend>) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let layout = match Object::parse(data.data())? {
            Object::PE(pe) => Self::layout_pe(&pe),
            Object::Elf(elf) => Self::layout_elf(&elf),
            Object::Mach(Mach::Binary(macho)) => Self::layout_macho(&macho)?,
            _ => return Err(NotSupported),
        };

        tracing::debug!(
            format = ?layout.format,
            sections = layout.sections.len(),
            exports = layout.exports.len(),
            "loaded native image"
        );

        Ok(File {
            data,
            format: layout.format,
            image_base: layout.image_base,
            pointer_size: layout.pointer_size,
            sections: layout.sections,
            exports: layout.exports,
        })
    }

    /// Container format of this image
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[allow(clippy::unnecessary_cast)]
    fn layout_pe(pe: &goblin::pe::PE<'_>) -> ImageLayout {
        const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;

        let image_base = pe.image_base as u64;
        let sections = pe
            .sections
            .iter()
            .map(|section| Section {
                name: section.name().unwrap_or_default().to_string(),
                virtual_address: image_base + u64::from(section.virtual_address),
                virtual_size: u64::from(section.virtual_size.max(section.size_of_raw_data)),
                file_offset: u64::from(section.pointer_to_raw_data),
                file_size: u64::from(section.size_of_raw_data),
                executable: section.characteristics & IMAGE_SCN_MEM_EXECUTE != 0,
            })
            .collect();

        let exports = pe
            .exports
            .iter()
            .filter_map(|export| {
                export.name.map(|name| ExportedSymbol {
                    name: name.to_string(),
                    address: image_base + export.rva as u64,
                })
            })
            .collect();

        ImageLayout {
            format: ImageFormat::Pe,
            image_base,
            pointer_size: if pe.is_64 { 8 } else { 4 },
            sections,
            exports,
        }
    }

    fn layout_elf(elf: &goblin::elf::Elf<'_>) -> ImageLayout {
        let image_base = elf
            .program_headers
            .iter()
            .filter(|ph| ph.p_type == PT_LOAD)
            .map(|ph| ph.p_vaddr)
            .min()
            .unwrap_or(0);

        let mut sections: Vec<Section> = elf
            .section_headers
            .iter()
            .filter(|sh| sh.sh_flags & u64::from(SHF_ALLOC) != 0 && sh.sh_type != SHT_NOBITS)
            .filter(|sh| sh.sh_addr != 0 && sh.sh_size != 0)
            .map(|sh| Section {
                name: elf
                    .shdr_strtab
                    .get_at(sh.sh_name)
                    .unwrap_or_default()
                    .to_string(),
                virtual_address: sh.sh_addr,
                virtual_size: sh.sh_size,
                file_offset: sh.sh_offset,
                file_size: sh.sh_size,
                executable: sh.sh_flags & u64::from(SHF_EXECINSTR) != 0,
            })
            .collect();

        // Dumped or packed libraries frequently ship without usable section headers
        if sections.is_empty() {
            sections = elf
                .program_headers
                .iter()
                .filter(|ph| ph.p_type == PT_LOAD)
                .map(|ph| Section {
                    name: "LOAD".to_string(),
                    virtual_address: ph.p_vaddr,
                    virtual_size: ph.p_memsz,
                    file_offset: ph.p_offset,
                    file_size: ph.p_filesz,
                    executable: ph.p_flags & PF_X != 0,
                })
                .collect();
        }

        let exports = elf
            .dynsyms
            .iter()
            .map(|sym| (sym, &elf.dynstrtab))
            .chain(elf.syms.iter().map(|sym| (sym, &elf.strtab)))
            .filter(|(sym, _)| sym.st_value != 0 && sym.st_shndx != 0)
            .filter_map(|(sym, strtab)| {
                let name = strtab.get_at(sym.st_name)?;
                if name.is_empty() {
                    return None;
                }
                Some(ExportedSymbol {
                    name: name.to_string(),
                    address: sym.st_value,
                })
            })
            .collect();

        ImageLayout {
            format: ImageFormat::Elf,
            image_base,
            pointer_size: if elf.is_64 { 8 } else { 4 },
            sections,
            exports,
        }
    }

    fn layout_macho(macho: &goblin::mach::MachO<'_>) -> Result<ImageLayout> {
        const VM_PROT_EXECUTE: u32 = 0x4;

        let mut image_base = 0;
        let mut sections = Vec::new();
        for segment in macho.segments.iter() {
            let name = segment.name().unwrap_or_default().to_string();
            if name == "__TEXT" {
                image_base = segment.vmaddr;
            }
            if segment.filesize == 0 {
                continue;
            }
            sections.push(Section {
                name,
                virtual_address: segment.vmaddr,
                virtual_size: segment.vmsize,
                file_offset: segment.fileoff,
                file_size: segment.filesize,
                executable: segment.initprot & VM_PROT_EXECUTE != 0,
            });
        }

        let exports = macho
            .exports()?
            .into_iter()
            .map(|export| ExportedSymbol {
                name: export
                    .name
                    .strip_prefix('_')
                    .unwrap_or(&export.name)
                    .to_string(),
                address: image_base + export.offset,
            })
            .collect();

        Ok(ImageLayout {
            format: ImageFormat::MachO,
            image_base,
            pointer_size: if macho.is_64 { 8 } else { 4 },
            sections,
            exports,
        })
    }
}

impl BinaryImage for File {
    fn data(&self) -> &[u8] {
        self.data.data()
    }

    fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    fn image_base(&self) -> u64 {
        self.image_base
    }

    fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn exports(&self) -> &[ExportedSymbol] {
        &self.exports
    }
}

struct ImageLayout {
    format: ImageFormat,
    image_base: u64,
    pointer_size: usize,
    sections: Vec<Section>,
    exports: Vec<ExportedSymbol>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_unknown() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
        assert!(File::from_mem(vec![0xAA; 128]).is_err());
    }

    #[test]
    fn test_section_ranges() {
        let section = Section {
            name: ".text".to_string(),
            virtual_address: 0x1000,
            virtual_size: 0x200,
            file_offset: 0x400,
            file_size: 0x100,
            executable: true,
        };

        assert!(section.contains_va(0x1000));
        assert!(section.contains_va(0x10FF));
        assert!(!section.contains_va(0x1100));
        assert!(!section.contains_va(0xFFF));
        assert!(section.contains_offset(0x4FF));
        assert!(!section.contains_offset(0x500));
        assert_eq!(section.file_end_va(), 0x1100);
    }
}
