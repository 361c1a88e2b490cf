use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `Module` table describes the current module. `TableId` = 0x00
#[derive(Clone, Debug)]
pub struct ModuleRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Generation, reserved, shall be zero
    pub generation: u16,
    /// an index into the String heap
    pub name: u32,
    /// an index into the GUID heap, the module version id
    pub mvid: u32,
    /// an index into the GUID heap, reserved
    pub enc_id: u32,
    /// an index into the GUID heap, reserved
    pub enc_base_id: u32,
}

impl<'a> RowDefinition<'a> for ModuleRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* generation */    2 +
        /* name */          u32::from(info.str_bytes()) +
        /* mvid */          u32::from(info.guid_bytes()) +
        /* enc_id */        u32::from(info.guid_bytes()) +
        /* enc_base_id */   u32::from(info.guid_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Token::for_row(TableId::Module, rid),
            generation: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, info.is_large_guid())?,
            enc_id: read_le_at_dyn(data, offset, info.is_large_guid())?,
            enc_base_id: read_le_at_dyn(data, offset, info.is_large_guid())?,
        })
    }
}
