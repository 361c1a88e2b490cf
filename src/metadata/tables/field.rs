use bitflags::bitflags;

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

bitflags! {
    /// `FieldAttributes` flag word of a Field row (II.23.1.5).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FieldAttributes: u16 {
        /// Accessible to everyone (three-bit access value 6)
        const PUBLIC = 0x0006;
        /// Field belongs to the type, not to instances
        const STATIC = 0x0010;
        /// Writable only inside constructors
        const INIT_ONLY = 0x0020;
        /// Compile time constant; the value lives in the Constant table
        const LITERAL = 0x0040;
        /// Name has special meaning to tooling
        const SPECIAL_NAME = 0x0200;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

/// The `Field` table holds the fields of all types, in owner order. `TableId` = 0x04
#[derive(Clone, Debug)]
pub struct FieldRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a 2-byte bitmask of type `FieldAttributes`
    pub flags: u16,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap, a `FieldSig`
    pub signature: u32,
}

impl FieldRaw {
    /// The decoded flag word
    #[must_use]
    pub fn attributes(&self) -> FieldAttributes {
        FieldAttributes::from_bits_retain(self.flags)
    }
}

impl<'a> RowDefinition<'a> for FieldRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* flags */     2 +
        /* name */      u32::from(info.str_bytes()) +
        /* signature */ u32::from(info.blob_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            token: Token::for_row(TableId::Field, rid),
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
            signature: read_le_at_dyn(data, offset, info.is_large_blob())?,
        })
    }
}
