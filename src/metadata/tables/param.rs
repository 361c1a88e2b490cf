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
    /// `ParamAttributes` flag word of a Param row (II.23.1.13).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ParamAttributes: u16 {
        /// Parameter is an input
        const IN = 0x0001;
        /// Parameter is an output
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
        /// Parameter has a default value
        const HAS_DEFAULT = 0x1000;
        /// Parameter has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

/// The `Param` table names and flags method parameters. `TableId` = 0x08
///
/// Sequence 0 describes the return value; 1..n the parameters.
#[derive(Clone, Debug)]
pub struct ParamRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a 2-byte bitmask of type `ParamAttributes`
    pub flags: u16,
    /// a 2-byte constant, the parameter position
    pub sequence: u16,
    /// an index into the String heap
    pub name: u32,
}

impl ParamRaw {
    /// The decoded flag word
    #[must_use]
    pub fn attributes(&self) -> ParamAttributes {
        ParamAttributes::from_bits_retain(self.flags)
    }
}

impl<'a> RowDefinition<'a> for ParamRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* flags */    2 +
        /* sequence */ 2 +
        /* name */     u32::from(info.str_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(ParamRaw {
            rid,
            token: Token::for_row(TableId::Param, rid),
            flags: read_le_at::<u16>(data, offset)?,
            sequence: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
        })
    }
}
