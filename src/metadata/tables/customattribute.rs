use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::{CodedIndex, CodedIndexType, RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `CustomAttribute` table attaches attributes to metadata entities. `TableId` = 0x0C
///
/// All the `.winmd` interop facts (handle release functions, typedef
/// markers, array sizing) travel through this table.
#[derive(Clone, Debug)]
pub struct CustomAttributeRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// the attributed entity; a `HasCustomAttribute` coded index
    pub parent: CodedIndex,
    /// the attribute constructor; a `CustomAttributeType` coded index
    pub constructor: CodedIndex,
    /// an index into the Blob heap, the argument payload
    pub value: u32,
}

impl<'a> RowDefinition<'a> for CustomAttributeRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* parent */      u32::from(info.coded_index_bytes(CodedIndexType::HasCustomAttribute)) +
        /* constructor */ u32::from(info.coded_index_bytes(CodedIndexType::CustomAttributeType)) +
        /* value */       u32::from(info.blob_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(CustomAttributeRaw {
            rid,
            token: Token::for_row(TableId::CustomAttribute, rid),
            parent: CodedIndex::read(data, offset, info, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(data, offset, info, CodedIndexType::CustomAttributeType)?,
            value: read_le_at_dyn(data, offset, info.is_large_blob())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::streams::{MetadataTable, TableId};

    #[test]
    fn crafted_short() {
        let data = vec![
            0x43, 0x00, // parent: tag 3 (TypeDef), row 2
            0x0B, 0x00, // constructor: tag 3 (MemberRef), row 1
            0x30, 0x00, // value
        ];

        let info = TableInfo::new_test(
            &[(TableId::TypeDef, 8), (TableId::MemberRef, 8)],
            false,
            false,
            false,
        );
        let table = MetadataTable::<CustomAttributeRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x0C000001);
        assert_eq!(row.parent.tag, TableId::TypeDef);
        assert_eq!(row.parent.row, 2);
        assert_eq!(row.constructor.tag, TableId::MemberRef);
        assert_eq!(row.constructor.row, 1);
        assert_eq!(row.value, 0x30);
    }
}
