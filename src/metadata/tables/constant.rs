use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{CodedIndex, CodedIndexType, RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `Constant` table holds compile time constant values. `TableId` = 0x0B
///
/// The `base_type` byte is the `ELEMENT_TYPE` of the payload in the blob
/// heap; the parent is the literal field (or defaulted parameter) owning the
/// value.
#[derive(Clone, Debug)]
pub struct ConstantRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a 1-byte `ELEMENT_TYPE` constant describing the payload
    pub base_type: u8,
    /// an index into `Field`, `Param` or `Property`; a `HasConstant` coded index
    pub parent: CodedIndex,
    /// an index into the Blob heap
    pub value: u32,
}

impl<'a> RowDefinition<'a> for ConstantRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* base_type + padding */ 2 +
        /* parent */              u32::from(info.coded_index_bytes(CodedIndexType::HasConstant)) +
        /* value */               u32::from(info.blob_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        let base_type = read_le_at::<u8>(data, offset)?;
        let _padding = read_le_at::<u8>(data, offset)?;

        Ok(ConstantRaw {
            rid,
            token: Token::for_row(TableId::Constant, rid),
            base_type,
            parent: CodedIndex::read(data, offset, info, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, info.is_large_blob())?,
        })
    }
}
