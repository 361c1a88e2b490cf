use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `ModuleRef` table names the native modules imports resolve to. `TableId` = 0x1A
///
/// For a `.winmd` these are the export libraries (`KERNEL32.dll` and
/// friends) referenced by `ImplMap` rows.
#[derive(Clone, Debug)]
pub struct ModuleRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// an index into the String heap
    pub name: u32,
}

impl<'a> RowDefinition<'a> for ModuleRefRaw {
    fn row_size(info: &TableInfo) -> u32 {
        /* name */
        u32::from(info.str_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(ModuleRefRaw {
            rid,
            token: Token::for_row(TableId::ModuleRef, rid),
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
        })
    }
}
