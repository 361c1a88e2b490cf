//! PE container access for Windows metadata files.
//!
//! A `.winmd` is an ECMA-335 metadata blob carried inside a plain PE image.
//! [`File`] opens the image (from disk or memory), validates that a CLR
//! runtime header is present, and keeps just enough of the PE geometry in
//! owned form (section ranges, CLR directory location) to resolve RVAs into
//! file offsets. The goblin parse itself is not retained.

pub(crate) mod io;
mod memory;
pub(crate) mod parser;
mod physical;

use std::path::Path;

use goblin::pe::PE;

use crate::{Error::Empty, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for metadata file data sources.
///
/// Abstracts over the source of the raw bytes so that both on-disk
/// (memory-mapped) and in-memory inputs are handled uniformly.
pub trait Backend {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// One PE section, reduced to the geometry needed for address translation.
#[derive(Clone, Copy, Debug)]
struct SectionRange {
    rva: u32,
    virtual_size: u32,
    raw_offset: u32,
    raw_size: u32,
}

/// A loaded Windows metadata file.
///
/// Owns the backing bytes for the lifetime of the generator session and
/// exposes RVA translation plus the location of the CLR metadata directory.
///
/// # Examples
///
/// ```rust,no_run
/// use wingen::File;
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("Windows.Win32.winmd"))?;
/// let (metadata_rva, metadata_size) = file.clr();
/// println!("metadata directory: RVA=0x{:x}, size={}", metadata_rva, metadata_size);
/// # Ok::<(), wingen::Error>(())
/// ```
pub struct File {
    data: Box<dyn Backend>,
    sections: Vec<SectionRange>,
    clr_rva: u32,
    clr_size: u32,
}

impl File {
    /// Loads a metadata file from the given path via a memory mapping.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a valid PE image,
    /// or carries no CLR runtime header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a metadata file from a memory buffer.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty, is not a valid PE image, or
    /// carries no CLR runtime header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(backend: T) -> Result<File> {
        if backend.len() == 0 {
            return Err(Empty);
        }

        let (sections, clr_rva, clr_size) = {
            let pe = PE::parse(backend.data())?;

            let Some(optional_header) = pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            let Some(clr) = optional_header.data_directories.get_clr_runtime_header() else {
                return Err(malformed_error!(
                    "File does not have a CLR runtime header directory"
                ));
            };

            let sections = pe
                .sections
                .iter()
                .map(|section| SectionRange {
                    rva: section.virtual_address,
                    virtual_size: section.virtual_size,
                    raw_offset: section.pointer_to_raw_data,
                    raw_size: section.size_of_raw_data,
                })
                .collect();

            (sections, clr.virtual_address, clr.size)
        };

        Ok(File {
            data: Box::new(backend),
            sections,
            clr_rva,
            clr_size,
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// RVA and size of the CLR (COR20) runtime header directory.
    #[must_use]
    pub fn clr(&self) -> (usize, usize) {
        (self.clr_rva as usize, self.clr_size as usize)
    }

    /// The raw bytes of the whole file.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// A bounds checked slice of the file contents.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        if offset + len > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        Ok(&self.data.data()[offset..offset + len])
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOffset`] if no section covers `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva = u32::try_from(rva).map_err(|_| crate::Error::InvalidOffset)?;

        for section in &self.sections {
            let span = section.virtual_size.max(section.raw_size);
            if rva >= section.rva && rva < section.rva + span {
                let delta = rva - section.rva;
                if delta >= section.raw_size {
                    return Err(crate::Error::InvalidOffset);
                }
                return Ok((section.raw_offset + delta) as usize);
            }
        }

        Err(crate::Error::InvalidOffset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let result = File::from_mem(vec![0x00; 128]);
        assert!(result.is_err());
    }

    #[test]
    fn rva_translation_uses_section_ranges() {
        let file = File {
            data: Box::new(memory::Memory::new(vec![0u8; 0x600])),
            sections: vec![SectionRange {
                rva: 0x2000,
                virtual_size: 0x400,
                raw_offset: 0x200,
                raw_size: 0x400,
            }],
            clr_rva: 0x2008,
            clr_size: 72,
        };

        assert_eq!(file.rva_to_offset(0x2000).unwrap(), 0x200);
        assert_eq!(file.rva_to_offset(0x2104).unwrap(), 0x304);
        assert!(file.rva_to_offset(0x1000).is_err());
        assert!(file.rva_to_offset(0x2400).is_err());
    }
}
