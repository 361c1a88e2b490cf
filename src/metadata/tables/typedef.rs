use bitflags::bitflags;

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{CodedIndex, CodedIndexType, RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

bitflags! {
    /// `TypeAttributes` flag word of a `TypeDef` row (II.23.1.15).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TypeAttributes: u32 {
        /// Type is visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested type with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Fields are laid out at explicit offsets
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type is abstract
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name has special meaning to tooling
        const SPECIAL_NAME = 0x0000_0400;
        /// Type is imported from COM
        const IMPORT = 0x0000_1000;
        /// Windows Runtime type
        const WINDOWS_RUNTIME = 0x0000_4000;
        /// String marshalling defaults to Unicode
        const UNICODE_CLASS = 0x0001_0000;
        /// Static initialization is relaxed
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

/// The `TypeDef` table defines the types of the current module. `TableId` = 0x02
#[derive(Clone, Debug)]
pub struct TypeDefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a 4-byte bitmask of type `TypeAttributes`
    pub flags: u32,
    /// an index into the String heap
    pub type_name: u32,
    /// an index into the String heap
    pub type_namespace: u32,
    /// an index into `TypeDef`, `TypeRef` or `TypeSpec`; a `TypeDefOrRef` coded index
    pub extends: CodedIndex,
    /// an index into the Field table; the first of a contiguous run owned by this type
    pub field_list: u32,
    /// an index into the `MethodDef` table; the first of a contiguous run owned by this type
    pub method_list: u32,
}

impl TypeDefRaw {
    /// The decoded flag word
    #[must_use]
    pub fn attributes(&self) -> TypeAttributes {
        TypeAttributes::from_bits_retain(self.flags)
    }
}

impl<'a> RowDefinition<'a> for TypeDefRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* flags */             4 +
        /* type_name */         u32::from(info.str_bytes()) +
        /* type_namespace */    u32::from(info.str_bytes()) +
        /* extends */           u32::from(info.coded_index_bytes(CodedIndexType::TypeDefOrRef)) +
        /* field_list */        u32::from(info.table_index_bytes(TableId::Field)) +
        /* method_list */       u32::from(info.table_index_bytes(TableId::MethodDef))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::for_row(TableId::TypeDef, rid),
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, info.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, info.is_large_str())?,
            extends: CodedIndex::read(data, offset, info, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, info.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, info.is_large(TableId::MethodDef))?,
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
            0x09, 0x01, 0x00, 0x00, // flags: public, sequential, sealed
            0x42, 0x00, // type_name
            0x43, 0x00, // type_namespace
            0x05, 0x00, // extends: tag 1 (TypeRef), row 1
            0x01, 0x00, // field_list
            0x01, 0x00, // method_list
        ];

        let info = TableInfo::new_test(
            &[
                (TableId::Field, 8),
                (TableId::MethodDef, 8),
                (TableId::TypeRef, 8),
            ],
            false,
            false,
            false,
        );
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x02000001);
        assert!(row.attributes().contains(TypeAttributes::PUBLIC));
        assert!(row.attributes().contains(TypeAttributes::SEQUENTIAL_LAYOUT));
        assert!(row.attributes().contains(TypeAttributes::SEALED));
        assert_eq!(row.extends.tag, TableId::TypeRef);
        assert_eq!(row.extends.row, 1);
        assert_eq!(row.field_list, 1);
        assert_eq!(row.method_list, 1);
    }

    #[test]
    fn crafted_long() {
        let data = vec![
            0x20, 0x00, 0x00, 0x00, // flags: interface
            0x00, 0x00, 0x00, 0x02, // type_name
            0x00, 0x00, 0x00, 0x03, // type_namespace
            0x04, 0x00, 0x00, 0x00, // extends: tag 0 (TypeDef), row 1
            0x05, 0x00, 0x00, 0x00, // field_list
            0x06, 0x00, 0x00, 0x00, // method_list
        ];

        let info = TableInfo::new_test(
            &[
                (TableId::Field, u32::from(u16::MAX) + 2),
                (TableId::MethodDef, u32::from(u16::MAX) + 2),
                (TableId::TypeDef, u32::from(u16::MAX) + 2),
            ],
            true,
            true,
            true,
        );
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert!(row.attributes().contains(TypeAttributes::INTERFACE));
        assert_eq!(row.type_name, 0x02000000);
        assert_eq!(row.type_namespace, 0x03000000);
        assert_eq!(row.extends.tag, TableId::TypeDef);
        assert_eq!(row.extends.row, 1);
        assert_eq!(row.field_list, 5);
        assert_eq!(row.method_list, 6);
    }
}
