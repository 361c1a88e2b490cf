use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::{CodedIndex, CodedIndexType, RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The `TypeRef` table references types defined in other scopes. `TableId` = 0x01
///
/// In a `.winmd` these are the mscorlib anchors (`System.ValueType`,
/// `System.Enum`, `System.Guid`, ...) plus the interop attribute types.
#[derive(Clone, Debug)]
pub struct TypeRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// an index into `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef`; a `ResolutionScope` coded index
    pub resolution_scope: CodedIndex,
    /// an index into the String heap
    pub type_name: u32,
    /// an index into the String heap
    pub type_namespace: u32,
}

impl<'a> RowDefinition<'a> for TypeRefRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* resolution_scope */  u32::from(info.coded_index_bytes(CodedIndexType::ResolutionScope)) +
        /* type_name */         u32::from(info.str_bytes()) +
        /* type_namespace */    u32::from(info.str_bytes())
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::for_row(TableId::TypeRef, rid),
            resolution_scope: CodedIndex::read(data, offset, info, CodedIndexType::ResolutionScope)?,
            type_name: read_le_at_dyn(data, offset, info.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, info.is_large_str())?,
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
            0x0A, 0x00, // resolution_scope: tag 2 (AssemblyRef), row 2
            0x50, 0x00, // type_name
            0x60, 0x00, // type_namespace
        ];

        let info = TableInfo::new_test(&[(TableId::AssemblyRef, 4)], false, false, false);
        let table = MetadataTable::<TypeRefRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x01000001);
        assert_eq!(row.resolution_scope.tag, TableId::AssemblyRef);
        assert_eq!(row.resolution_scope.row, 2);
        assert_eq!(row.type_name, 0x50);
        assert_eq!(row.type_namespace, 0x60);
    }
}
