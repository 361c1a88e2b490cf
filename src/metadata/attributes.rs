//! Interop attribute decoding.
//!
//! The Win32 metadata expresses everything interop related (handle release
//! functions, typedef markers, array sizing, bitfields) through custom
//! attributes. Attribute identity is the constructor's declaring type name;
//! the payload is a blob in the II.23.3 layout: a `0x0001` prolog, the fixed
//! arguments of the constructor, then named field/property arguments.
//!
//! The vocabulary is closed, so each kind decodes its own fixed argument
//! shape instead of going through a general purpose reader.

use crate::{file::parser::Parser, Result};

/// A GUID value decomposed into its four record fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuidValue {
    /// The first 32 bits
    pub data1: u32,
    /// The next 16 bits
    pub data2: u16,
    /// The next 16 bits
    pub data3: u16,
    /// The final 8 bytes
    pub data4: [u8; 8],
}

/// A decoded interop attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrDecl {
    /// The handle typedef is released by the named function
    RaiiFree {
        /// Name of the release function
        release: String,
    },
    /// The type is a handle typedef wrapping a single scalar
    NativeTypedef,
    /// A raw handle value that denotes "no handle"
    InvalidHandleValue {
        /// The sentinel value
        value: i64,
    },
    /// The handle typedef may stand in for another handle type
    AlsoUsableFor {
        /// Name of the other handle type
        other: String,
    },
    /// The handle names a kernel namespace, not a releasable resource
    NamespaceHandle,
    /// The constant belongs to the body of the named enum
    AssociatedEnum {
        /// Short name of the enum
        enum_name: String,
    },
    /// Array sizing facts for a parameter or field
    NativeArrayInfo {
        /// Index of the parameter carrying the element count
        count_param_index: Option<u16>,
        /// Fixed element count
        count_const: Option<i32>,
    },
    /// One bitfield carved out of the attributed backing field
    NativeBitfield {
        /// Accessor name
        name: String,
        /// Bit offset within the backing scalar
        offset: i64,
        /// Width in bits
        length: i64,
    },
    /// A GUID payload, used for interface identities and GUID constants
    Guid {
        /// The decomposed value
        value: GuidValue,
    },
    /// Minimum OS platform carrying the attributed API
    SupportedOsPlatform {
        /// Platform name and version, e.g. `windows10.0.15063`
        platform: String,
    },
    /// Link to the online documentation of the attributed API
    Documentation {
        /// The URL
        url: String,
    },
    /// The trailing array field is variable length
    FlexibleArray,
    /// The attributed pointer parameter is read-only
    ConstParam,
    /// An attribute outside the interop vocabulary
    Unknown {
        /// The attribute type name
        name: String,
    },
}

fn read_prolog(parser: &mut Parser<'_>) -> Result<()> {
    let prolog = parser.read_le::<u16>()?;
    if prolog != 0x0001 {
        return Err(malformed_error!(
            "Invalid custom attribute prolog - 0x{:04x}",
            prolog
        ));
    }
    Ok(())
}

fn read_string_arg(blob: &[u8]) -> Result<String> {
    let mut parser = Parser::new(blob);
    read_prolog(&mut parser)?;
    match parser.read_ser_string()? {
        Some(text) => Ok(text),
        None => Err(malformed_error!("Attribute string argument is null")),
    }
}

fn read_guid_args(blob: &[u8]) -> Result<GuidValue> {
    let mut parser = Parser::new(blob);
    read_prolog(&mut parser)?;

    let data1 = parser.read_le::<u32>()?;
    let data2 = parser.read_le::<u16>()?;
    let data3 = parser.read_le::<u16>()?;
    let mut data4 = [0u8; 8];
    for byte in &mut data4 {
        *byte = parser.read_le::<u8>()?;
    }

    Ok(GuidValue {
        data1,
        data2,
        data3,
        data4,
    })
}

fn read_array_info(blob: &[u8]) -> Result<AttrDecl> {
    let mut parser = Parser::new(blob);
    read_prolog(&mut parser)?;

    let mut count_param_index = None;
    let mut count_const = None;

    let named_count = parser.read_le::<u16>()?;
    for _ in 0..named_count {
        let kind = parser.read_le::<u8>()?;
        if kind != 0x53 && kind != 0x54 {
            return Err(malformed_error!(
                "Invalid named argument kind - 0x{:02x}",
                kind
            ));
        }

        let element_type = parser.read_le::<u8>()?;
        let Some(name) = parser.read_ser_string()? else {
            return Err(malformed_error!("Named argument without a name"));
        };

        match (name.as_str(), element_type) {
            ("CountParamIndex", 0x06) => {
                count_param_index = Some(parser.read_le::<u16>()? & 0x7FFF);
            }
            ("CountParamIndex", 0x07) => {
                count_param_index = Some(parser.read_le::<u16>()?);
            }
            ("CountConst", 0x08) => {
                count_const = Some(parser.read_le::<i32>()?);
            }
            ("CountConst", 0x09) => {
                count_const = Some(parser.read_le::<u32>()? as i32);
            }
            (_, 0x02) | (_, 0x04) | (_, 0x05) => {
                let _ = parser.read_le::<u8>()?;
            }
            (_, 0x06) | (_, 0x07) => {
                let _ = parser.read_le::<u16>()?;
            }
            (_, 0x08) | (_, 0x09) => {
                let _ = parser.read_le::<u32>()?;
            }
            (_, 0x0A) | (_, 0x0B) => {
                let _ = parser.read_le::<u64>()?;
            }
            (_, 0x0E) => {
                let _ = parser.read_ser_string()?;
            }
            (name, element_type) => {
                return Err(malformed_error!(
                    "Unsupported named argument '{}' of type 0x{:02x}",
                    name,
                    element_type
                ));
            }
        }
    }

    Ok(AttrDecl::NativeArrayInfo {
        count_param_index,
        count_const,
    })
}

fn read_bitfield_args(blob: &[u8]) -> Result<AttrDecl> {
    let mut parser = Parser::new(blob);
    read_prolog(&mut parser)?;

    let Some(name) = parser.read_ser_string()? else {
        return Err(malformed_error!("Bitfield without a name"));
    };
    let offset = parser.read_le::<i64>()?;
    let length = parser.read_le::<i64>()?;

    Ok(AttrDecl::NativeBitfield {
        name,
        offset,
        length,
    })
}

fn read_invalid_handle_value(blob: &[u8]) -> Result<AttrDecl> {
    let mut parser = Parser::new(blob);
    read_prolog(&mut parser)?;
    Ok(AttrDecl::InvalidHandleValue {
        value: parser.read_le::<i64>()?,
    })
}

/// Decode one attribute from its constructor's type name and value blob.
///
/// ## Arguments
/// * '`attr_type`' - Short name of the attribute type, e.g. `RAIIFreeAttribute`
/// * 'blob'        - The argument payload
///
/// # Errors
/// Returns an error if the payload does not match the fixed argument shape
/// of the named attribute. Unrecognized attribute names decode to
/// [`AttrDecl::Unknown`] and are never an error.
pub fn decode(attr_type: &str, blob: &[u8]) -> Result<AttrDecl> {
    match attr_type {
        "RAIIFreeAttribute" => Ok(AttrDecl::RaiiFree {
            release: read_string_arg(blob)?,
        }),
        "NativeTypedefAttribute" => Ok(AttrDecl::NativeTypedef),
        "InvalidHandleValueAttribute" => read_invalid_handle_value(blob),
        "AlsoUsableForAttribute" => Ok(AttrDecl::AlsoUsableFor {
            other: read_string_arg(blob)?,
        }),
        "NamespaceHandleAttribute" => Ok(AttrDecl::NamespaceHandle),
        "AssociatedEnumAttribute" => Ok(AttrDecl::AssociatedEnum {
            enum_name: read_string_arg(blob)?,
        }),
        "NativeArrayInfoAttribute" => read_array_info(blob),
        "NativeBitfieldAttribute" => read_bitfield_args(blob),
        "GuidAttribute" => Ok(AttrDecl::Guid {
            value: read_guid_args(blob)?,
        }),
        "SupportedOSPlatformAttribute" => Ok(AttrDecl::SupportedOsPlatform {
            platform: read_string_arg(blob)?,
        }),
        "DocumentationAttribute" => Ok(AttrDecl::Documentation {
            url: read_string_arg(blob)?,
        }),
        "FlexibleArrayAttribute" => Ok(AttrDecl::FlexibleArray),
        "ConstAttribute" => Ok(AttrDecl::ConstParam),
        other => Ok(AttrDecl::Unknown {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_blob(text: &str) -> Vec<u8> {
        let mut blob = vec![0x01, 0x00];
        blob.push(u8::try_from(text.len()).unwrap());
        blob.extend_from_slice(text.as_bytes());
        blob.extend_from_slice(&[0x00, 0x00]); // no named args
        blob
    }

    #[test]
    fn raii_free_decodes_release_name() {
        let decoded = decode("RAIIFreeAttribute", &string_blob("CloseHandle")).unwrap();
        assert_eq!(
            decoded,
            AttrDecl::RaiiFree {
                release: "CloseHandle".to_string()
            }
        );
    }

    #[test]
    fn marker_attributes_need_no_payload() {
        assert_eq!(
            decode("NativeTypedefAttribute", &[0x01, 0x00, 0x00, 0x00]).unwrap(),
            AttrDecl::NativeTypedef
        );
        assert_eq!(
            decode("NamespaceHandleAttribute", &[0x01, 0x00, 0x00, 0x00]).unwrap(),
            AttrDecl::NamespaceHandle
        );
    }

    #[test]
    fn invalid_handle_value_decodes() {
        let mut blob = vec![0x01, 0x00];
        blob.extend_from_slice(&(-1i64).to_le_bytes());
        blob.extend_from_slice(&[0x00, 0x00]);

        let decoded = decode("InvalidHandleValueAttribute", &blob).unwrap();
        assert_eq!(decoded, AttrDecl::InvalidHandleValue { value: -1 });
    }

    #[test]
    fn guid_decodes_eleven_fields() {
        let mut blob = vec![0x01, 0x00];
        blob.extend_from_slice(&0x8E01_8A9Du32.to_le_bytes());
        blob.extend_from_slice(&0x2415u16.to_le_bytes());
        blob.extend_from_slice(&0x4677u16.to_le_bytes());
        blob.extend_from_slice(&[0xBF, 0x6C, 0x19, 0x3D, 0x50, 0xB6, 0xF4, 0x63]);
        blob.extend_from_slice(&[0x00, 0x00]);

        let decoded = decode("GuidAttribute", &blob).unwrap();
        assert_eq!(
            decoded,
            AttrDecl::Guid {
                value: GuidValue {
                    data1: 0x8E01_8A9D,
                    data2: 0x2415,
                    data3: 0x4677,
                    data4: [0xBF, 0x6C, 0x19, 0x3D, 0x50, 0xB6, 0xF4, 0x63],
                }
            }
        );
    }

    #[test]
    fn native_array_info_named_args() {
        // Named arg: field (0x53), I2 (0x06), "CountParamIndex", value 2
        let mut blob = vec![0x01, 0x00, 0x01, 0x00];
        blob.push(0x53);
        blob.push(0x06);
        blob.push(15);
        blob.extend_from_slice(b"CountParamIndex");
        blob.extend_from_slice(&2u16.to_le_bytes());

        let decoded = decode("NativeArrayInfoAttribute", &blob).unwrap();
        assert_eq!(
            decoded,
            AttrDecl::NativeArrayInfo {
                count_param_index: Some(2),
                count_const: None,
            }
        );
    }

    #[test]
    fn native_bitfield_decodes() {
        let mut blob = vec![0x01, 0x00];
        blob.push(5);
        blob.extend_from_slice(b"fIcon");
        blob.extend_from_slice(&0i64.to_le_bytes());
        blob.extend_from_slice(&1i64.to_le_bytes());
        blob.extend_from_slice(&[0x00, 0x00]);

        let decoded = decode("NativeBitfieldAttribute", &blob).unwrap();
        assert_eq!(
            decoded,
            AttrDecl::NativeBitfield {
                name: "fIcon".to_string(),
                offset: 0,
                length: 1,
            }
        );
    }

    #[test]
    fn unknown_attributes_are_carried() {
        let decoded = decode("FancyNewAttribute", &[0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(
            decoded,
            AttrDecl::Unknown {
                name: "FancyNewAttribute".to_string()
            }
        );
    }

    #[test]
    fn bad_prolog_is_rejected() {
        assert!(decode("RAIIFreeAttribute", &[0x02, 0x00]).is_err());
    }
}
