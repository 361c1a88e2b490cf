use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `NestedClass` table links nested types to their enclosers. `TableId` = 0x29
///
/// The anonymous unions inside Win32 structs travel through this table.
#[derive(Clone, Debug)]
pub struct NestedClassRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// an index into the `TypeDef` table, the nested type
    pub nested_class: u32,
    /// an index into the `TypeDef` table, the enclosing type
    pub enclosing_class: u32,
}

impl<'a> RowDefinition<'a> for NestedClassRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* nested_class */    u32::from(info.table_index_bytes(TableId::TypeDef)) +
        /* enclosing_class */ u32::from(info.table_index_bytes(TableId::TypeDef))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(NestedClassRaw {
            rid,
            token: Token::for_row(TableId::NestedClass, rid),
            nested_class: read_le_at_dyn(data, offset, info.is_large(TableId::TypeDef))?,
            enclosing_class: read_le_at_dyn(data, offset, info.is_large(TableId::TypeDef))?,
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
            0x04, 0x00, // nested_class
            0x02, 0x00, // enclosing_class
        ];

        let info = TableInfo::new_test(&[(TableId::TypeDef, 8)], false, false, false);
        let table = MetadataTable::<NestedClassRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x29000001);
        assert_eq!(row.nested_class, 4);
        assert_eq!(row.enclosing_class, 2);
    }
}
