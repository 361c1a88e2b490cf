use bitflags::bitflags;

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        streams::{RowDefinition, TableId, TableInfo},
        token::Token,
    },
    Result,
};

bitflags! {
    /// `MethodAttributes` flag word of a `MethodDef` row (II.23.1.10).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MethodAttributes: u16 {
        /// Accessible to everyone (three-bit access value 6)
        const PUBLIC = 0x0006;
        /// Method belongs to the type, not to instances
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Method is abstract
        const ABSTRACT = 0x0400;
        /// Name has special meaning to tooling
        const SPECIAL_NAME = 0x0800;
        /// Implementation is forwarded through `ImplMap`
        const PINVOKE_IMPL = 0x2000;
    }
}

/// The `MethodDef` table holds the methods of all types, in owner order. `TableId` = 0x06
#[derive(Clone, Debug)]
pub struct MethodDefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// RVA of the implementation, zero for extern methods
    pub rva: u32,
    /// a 2-byte bitmask of type `MethodImplAttributes`
    pub impl_flags: u16,
    /// a 2-byte bitmask of type `MethodAttributes`
    pub flags: u16,
    /// an index into the String heap
    pub name: u32,
    /// an index into the Blob heap, a `MethodDefSig`
    pub signature: u32,
    /// an index into the Param table; the first of a contiguous run owned by this method
    pub param_list: u32,
}

impl MethodDefRaw {
    /// The decoded flag word
    #[must_use]
    pub fn attributes(&self) -> MethodAttributes {
        MethodAttributes::from_bits_retain(self.flags)
    }
}

impl<'a> RowDefinition<'a> for MethodDefRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* rva */        4 +
        /* impl_flags */ 2 +
        /* flags */      2 +
        /* name */       u32::from(info.str_bytes()) +
        /* signature */  u32::from(info.blob_bytes()) +
        /* param_list */ u32::from(info.table_index_bytes(TableId::Param))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Token::for_row(TableId::MethodDef, rid),
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
            signature: read_le_at_dyn(data, offset, info.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, info.is_large(TableId::Param))?,
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
            0x00, 0x00, 0x00, 0x00, // rva
            0x00, 0x00, // impl_flags
            0x16, 0x20, // flags: public, static, pinvoke
            0x42, 0x00, // name
            0x10, 0x00, // signature
            0x01, 0x00, // param_list
        ];

        let info = TableInfo::new_test(&[(TableId::Param, 8)], false, false, false);
        let table = MetadataTable::<MethodDefRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x06000001);
        assert_eq!(row.rva, 0);
        assert!(row.attributes().contains(MethodAttributes::PUBLIC));
        assert!(row.attributes().contains(MethodAttributes::STATIC));
        assert!(row.attributes().contains(MethodAttributes::PINVOKE_IMPL));
        assert_eq!(row.param_list, 1);
    }

    #[test]
    fn crafted_long() {
        let data = vec![
            0x00, 0x10, 0x00, 0x00, // rva
            0x00, 0x00, // impl_flags
            0xC6, 0x05, // flags: public, virtual, abstract, new slot, special name
            0x00, 0x00, 0x00, 0x02, // name
            0x00, 0x00, 0x00, 0x03, // signature
            0x04, 0x00, 0x00, 0x00, // param_list
        ];

        let info = TableInfo::new_test(
            &[(TableId::Param, u32::from(u16::MAX) + 2)],
            true,
            true,
            true,
        );
        let table = MetadataTable::<MethodDefRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.rva, 0x1000);
        assert!(row.attributes().contains(MethodAttributes::VIRTUAL));
        assert!(row.attributes().contains(MethodAttributes::ABSTRACT));
        assert_eq!(row.name, 0x02000000);
        assert_eq!(row.signature, 0x03000000);
        assert_eq!(row.param_list, 4);
    }
}
