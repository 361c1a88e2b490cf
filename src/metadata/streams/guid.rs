//! GUID heap (`#GUID`) access.
//!
//! The `#GUID` heap is a flat array of 16 byte GUID records. Indexes into it
//! are 1-based; index 0 denotes no GUID.
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{Error::OutOfBounds, Result};

/// Read access to the `#GUID` heap.
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Create a `Guid` view over the heap bytes
    ///
    /// # Errors
    /// Returns an error if the heap cannot hold a single GUID.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() < 16 {
            return Err(malformed_error!("Data for #GUID heap is too small"));
        }

        Ok(Guid { data })
    }

    /// Returns the GUID at the specified 1-based index
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if the index is zero or past the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index == 0 {
            return Err(OutOfBounds);
        }

        let start = (index - 1) * 16;
        if start + 16 > self.data.len() {
            return Err(OutOfBounds);
        }

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[start..start + 16]);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}
