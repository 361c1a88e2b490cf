use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `FieldLayout` table places fields of explicit layout types. `TableId` = 0x10
#[derive(Clone, Debug)]
pub struct FieldLayoutRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// the byte offset of the field within its type
    pub field_offset: u32,
    /// an index into the Field table
    pub field: u32,
}

impl<'a> RowDefinition<'a> for FieldLayoutRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* field_offset */ 4 +
        /* field */        u32::from(info.table_index_bytes(TableId::Field))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(FieldLayoutRaw {
            rid,
            token: Token::for_row(TableId::FieldLayout, rid),
            field_offset: read_le_at::<u32>(data, offset)?,
            field: read_le_at_dyn(data, offset, info.is_large(TableId::Field))?,
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
            0x00, 0x00, 0x00, 0x00, // field_offset
            0x05, 0x00, // field
        ];

        let info = TableInfo::new_test(&[(TableId::Field, 8)], false, false, false);
        let table = MetadataTable::<FieldLayoutRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x10000001);
        assert_eq!(row.field_offset, 0);
        assert_eq!(row.field, 5);
    }
}
