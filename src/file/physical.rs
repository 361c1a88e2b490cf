//! Memory-mapped backend for metadata files on disk.

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{file::Backend, Result};

/// Maps a file into memory and serves reads from the mapping.
///
/// The mapping stays alive for the lifetime of the backend, which matches the
/// generator's resource model: the metadata file is opened once and released
/// on teardown.
pub struct Physical {
    mmap: Mmap,
}

impl Physical {
    /// Map the file at `path` into memory
    ///
    /// ## Arguments
    /// * 'path' - Path of the metadata file to map
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped
    pub fn new(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;

        // Safety: the mapping is read-only and the file handle is kept open
        // by the mapping for its whole lifetime.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Physical { mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        &self.mmap
    }

    fn len(&self) -> usize {
        self.mmap.len()
    }
}
