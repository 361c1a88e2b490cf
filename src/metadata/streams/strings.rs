//! String heap (`#Strings`) access.
//!
//! Identifier strings (type names, method names, namespaces) live in the
//! `#Strings` heap as NUL terminated UTF-8, referenced by index from the
//! metadata tables.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::ffi::CStr;

use crate::{Error::OutOfBounds, Result};

/// Read access to the `#Strings` heap.
///
/// # Examples
///
/// ```rust,no_run
/// use wingen::metadata::streams::Strings;
/// let data = &[0u8, b'H', b'A', b'N', b'D', b'L', b'E', 0u8];
/// let strings = Strings::from(data).unwrap();
/// assert_eq!(strings.get(1).unwrap(), "HANDLE");
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a `Strings` view over the heap bytes
    ///
    /// # Errors
    /// Returns an error if the heap is empty or does not start with the
    /// mandatory empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Get the string at the provided heap index
    ///
    /// ## Arguments
    /// * 'index' - The offset within the heap (comes from metadata tables)
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds or the bytes are not
    /// valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => match result.to_str() {
                Ok(result) => Ok(result),
                Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
            },
            Err(_) => Err(malformed_error!("Invalid string at index - {}", index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let mut data = vec![0u8];
        data.extend_from_slice(b"HANDLE\0");
        data.extend_from_slice(b"Windows.Win32.Foundation\0");
        data.extend_from_slice(b"CloseHandle\0");

        let strings = Strings::from(&data).unwrap();
        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "HANDLE");
        assert_eq!(strings.get(8).unwrap(), "Windows.Win32.Foundation");
        assert_eq!(strings.get(33).unwrap(), "CloseHandle");

        // An index into the middle of an entry yields its suffix.
        assert_eq!(strings.get(34).unwrap(), "loseHandle");
    }

    #[test]
    fn invalid_heaps_are_rejected() {
        assert!(Strings::from(&[]).is_err());
        assert!(Strings::from(&[b'x']).is_err());
    }

    #[test]
    fn out_of_bounds_index() {
        let data = [0u8, b'a', 0u8];
        let strings = Strings::from(&data).unwrap();
        assert!(matches!(strings.get(64), Err(OutOfBounds)));
    }
}
