//! Physical metadata root and stream directory.
//!
//! The metadata root begins with the `BSJB` signature, carries a version
//! string, and is followed by the stream headers that locate `#~`,
//! `#Strings`, `#US`, `#GUID` and `#Blob` within the metadata blob.
//!
//! # Reference
//! - [ECMA-335 II.24.2.1 and II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Result};

/// Magic signature identifying a metadata root ("BSJB").
pub const METADATA_MAGIC: u32 = 0x424A_5342;

/// One entry of the stream directory following the metadata root.
#[derive(Clone, Debug)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#~` or `#Strings`
    pub name: String,
}

/// The parsed metadata root.
pub struct Root {
    /// Major version of the metadata format
    pub major_version: u16,
    /// Minor version of the metadata format
    pub minor_version: u16,
    /// The runtime version string, e.g. `v4.0.30319` or `WindowsRuntime 1.4`
    pub version: String,
    /// The stream directory
    pub streams: Vec<StreamHeader>,
}

impl Root {
    /// Parse a metadata root from the start of the metadata blob
    ///
    /// ## Arguments
    /// * 'data' - The metadata blob, starting at the root signature
    ///
    /// # Errors
    /// Returns an error if the signature is wrong, the version string is
    /// unreasonable, or a stream header runs past the blob.
    pub fn read(data: &[u8]) -> Result<Root> {
        let mut parser = Parser::new(data);

        let magic = parser.read_le::<u32>()?;
        if magic != METADATA_MAGIC {
            return Err(malformed_error!(
                "Invalid metadata signature - 0x{:08x}",
                magic
            ));
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let _reserved = parser.read_le::<u32>()?;

        let version_length = parser.read_le::<u32>()? as usize;
        if version_length == 0 || version_length > 255 {
            return Err(malformed_error!(
                "Unreasonable metadata version length - {}",
                version_length
            ));
        }

        let version_bytes = parser.read_bytes(version_length)?;
        let version = match std::str::from_utf8(version_bytes) {
            Ok(text) => text.trim_end_matches('\0').to_string(),
            Err(_) => return Err(malformed_error!("Metadata version string is not UTF-8")),
        };

        let _flags = parser.read_le::<u16>()?;
        let stream_count = parser.read_le::<u16>()? as usize;
        if stream_count == 0 || stream_count > 32 {
            return Err(malformed_error!(
                "Unreasonable stream count - {}",
                stream_count
            ));
        }

        let mut streams = Vec::with_capacity(stream_count);
        for _ in 0..stream_count {
            let offset = parser.read_le::<u32>()?;
            let size = parser.read_le::<u32>()?;

            // Stream names are NUL terminated ASCII padded to 4 bytes.
            let mut name = String::new();
            loop {
                let chunk = parser.read_bytes(4)?;
                let mut done = false;
                for byte in chunk {
                    if *byte == 0 {
                        done = true;
                        break;
                    }
                    name.push(*byte as char);
                }
                if done {
                    break;
                }
            }

            if (offset as usize) > data.len() || (offset as usize + size as usize) > data.len() {
                return Err(malformed_error!("Stream '{}' runs past the metadata", name));
            }

            streams.push(StreamHeader { offset, size, name });
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            streams,
        })
    }

    /// Find a stream header by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.streams.iter().find(|header| header.name == name)
    }
}
