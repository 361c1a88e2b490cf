use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::{CodedIndex, CodedIndexType, RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `MemberRef` table references members of other scopes. `TableId` = 0x0A
///
/// Custom attribute constructors resolve through this table: the parent is
/// the attribute's `TypeRef`, which carries the attribute type name.
#[derive(Clone, Debug)]
pub struct MemberRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// an index into `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef` or `TypeSpec`; a `MemberRefParent` coded index
    pub class: CodedIndex,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap
    pub signature: u32,
}

impl<'a> RowDefinition<'a> for MemberRefRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* class */     u32::from(info.coded_index_bytes(CodedIndexType::MemberRefParent)) +
        /* name */      u32::from(info.str_bytes()) +
        /* signature */ u32::from(info.blob_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(MemberRefRaw {
            rid,
            token: Token::for_row(TableId::MemberRef, rid),
            class: CodedIndex::read(data, offset, info, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
            signature: read_le_at_dyn(data, offset, info.is_large_blob())?,
        })
    }
}
