use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `ClassLayout` table carries packing and size overrides. `TableId` = 0x0F
#[derive(Clone, Debug)]
pub struct ClassLayoutRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a 2-byte value, the field alignment
    pub packing_size: u16,
    /// a 4-byte value, the total size of the type
    pub class_size: u32,
    /// an index into the `TypeDef` table
    pub parent: u32,
}

impl<'a> RowDefinition<'a> for ClassLayoutRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* packing_size */ 2 +
        /* class_size */   4 +
        /* parent */       u32::from(info.table_index_bytes(TableId::TypeDef))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(ClassLayoutRaw {
            rid,
            token: Token::for_row(TableId::ClassLayout, rid),
            packing_size: read_le_at::<u16>(data, offset)?,
            class_size: read_le_at::<u32>(data, offset)?,
            parent: read_le_at_dyn(data, offset, info.is_large(TableId::TypeDef))?,
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
            0x01, 0x00, // packing_size
            0x10, 0x00, 0x00, 0x00, // class_size
            0x03, 0x00, // parent
        ];

        let info = TableInfo::new_test(&[(TableId::TypeDef, 8)], false, false, false);
        let table = MetadataTable::<ClassLayoutRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x0F000001);
        assert_eq!(row.packing_size, 1);
        assert_eq!(row.class_size, 16);
        assert_eq!(row.parent, 3);
    }
}
