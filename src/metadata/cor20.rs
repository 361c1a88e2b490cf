//! CLR 2.0 (COR20) header parsing.
//!
//! The COR20 header sits at the `IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR` data
//! directory of the PE image and points at the physical metadata root.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// The main CLI header of a metadata carrying PE image.
pub struct Cor20Header {
    /// Size of the header in bytes, shall be 72
    pub cb: u32,
    /// The minimum runtime version required by this image
    pub major_runtime_version: u16,
    /// The minor portion of the runtime version
    pub minor_runtime_version: u16,
    /// RVA of the physical metadata root
    pub meta_data_rva: u32,
    /// Size of the physical metadata
    pub meta_data_size: u32,
    /// Runtime flags
    pub flags: u32,
    /// Entry point token, unused for pure metadata images
    pub entry_point_token: u32,
}

impl Cor20Header {
    /// Parse a `Cor20Header` from a sequence of bytes
    ///
    /// ## Arguments
    /// * 'data' - The byte slice from which this object shall be created
    ///
    /// # Errors
    /// Returns an error if the data is too short or a field fails the
    /// validation rules of ECMA-335 II.25.3.3.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb != 72 {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;
        if major_runtime_version == 0 || major_runtime_version > 10 {
            return Err(malformed_error!(
                "Invalid major runtime version: {}",
                major_runtime_version
            ));
        }

        let meta_data_rva = parser.read_le::<u32>()?;
        if meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        }

        let flags = parser.read_le::<u32>()?;
        let entry_point_token = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
        })
    }
}
