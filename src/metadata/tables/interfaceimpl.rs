use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::{CodedIndex, CodedIndexType, RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `InterfaceImpl` table lists the interfaces a type implements. `TableId` = 0x09
///
/// For COM interface typedefs this is the inheritance chain; rows of one
/// class appear in declaration order.
#[derive(Clone, Debug)]
pub struct InterfaceImplRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// an index into the `TypeDef` table, the implementing type
    pub class: u32,
    /// an index into `TypeDef`, `TypeRef` or `TypeSpec`; a `TypeDefOrRef` coded index
    pub interface: CodedIndex,
}

impl<'a> RowDefinition<'a> for InterfaceImplRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* class */     u32::from(info.table_index_bytes(TableId::TypeDef)) +
        /* interface */ u32::from(info.coded_index_bytes(CodedIndexType::TypeDefOrRef))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(InterfaceImplRaw {
            rid,
            token: Token::for_row(TableId::InterfaceImpl, rid),
            class: read_le_at_dyn(data, offset, info.is_large(TableId::TypeDef))?,
            interface: CodedIndex::read(data, offset, info, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::streams::MetadataTable;

    #[test]
    fn crafted_short() {
        let data = vec![
            0x02, 0x00, // class: TypeDef row 2
            0x0C, 0x00, // interface: tag 0 (TypeDef), row 3
        ];

        let info = TableInfo::new_test(&[(TableId::TypeDef, 8)], false, false, false);
        let table = MetadataTable::<InterfaceImplRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x09000001);
        assert_eq!(row.class, 2);
        assert_eq!(row.interface.tag, TableId::TypeDef);
        assert_eq!(row.interface.row, 3);
    }
}
