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
    /// `PInvokeAttributes` flag word of an `ImplMap` row (II.23.1.8).
    ///
    /// The character set and calling convention values are multi-bit
    /// fields; use [`PInvokeAttributes::calling_convention`] instead of
    /// testing their bits directly.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PInvokeAttributes: u16 {
        /// Use the import name exactly as given
        const NO_MANGLE = 0x0001;
        /// Marshal strings as ANSI
        const CHAR_SET_ANSI = 0x0002;
        /// Marshal strings as UTF-16
        const CHAR_SET_UNICODE = 0x0004;
        /// The import sets the thread's last-error code
        const SUPPORTS_LAST_ERROR = 0x0040;
    }
}

/// Calling convention requested by a P/Invoke mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PInvokeCallConv {
    /// Platform default, stdcall on 32-bit Windows
    Winapi,
    /// C calling convention
    Cdecl,
    /// Explicit stdcall
    Stdcall,
    /// Explicit thiscall
    Thiscall,
    /// Explicit fastcall
    Fastcall,
}

impl PInvokeAttributes {
    /// Decode the three-bit calling convention field
    #[must_use]
    pub fn calling_convention(&self) -> PInvokeCallConv {
        match self.bits() & 0x0700 {
            0x0200 => PInvokeCallConv::Cdecl,
            0x0300 => PInvokeCallConv::Stdcall,
            0x0400 => PInvokeCallConv::Thiscall,
            0x0500 => PInvokeCallConv::Fastcall,
            _ => PInvokeCallConv::Winapi,
        }
    }
}

/// The `ImplMap` table maps methods onto native imports. `TableId` = 0x1C
#[derive(Clone, Debug)]
pub struct ImplMapRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// a 2-byte bitmask of type `PInvokeAttributes`
    pub mapping_flags: u16,
    /// the forwarded method; a `MemberForwarded` coded index
    pub member_forwarded: CodedIndex,
    /// an index into the String heap, the native entry point name
    pub import_name: u32,
    /// an index into the `ModuleRef` table
    pub import_scope: u32,
}

impl ImplMapRaw {
    /// The decoded flag word
    #[must_use]
    pub fn attributes(&self) -> PInvokeAttributes {
        PInvokeAttributes::from_bits_retain(self.mapping_flags)
    }
}

impl<'a> RowDefinition<'a> for ImplMapRaw {
    #[rustfmt::skip]
    fn row_size(info: &TableInfo) -> u32 {
        /* mapping_flags */    2 +
        /* member_forwarded */ u32::from(info.coded_index_bytes(CodedIndexType::MemberForwarded)) +
        /* import_name */      u32::from(info.str_bytes()) +
        /* import_scope */     u32::from(info.table_index_bytes(TableId::ModuleRef))
    }

    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(ImplMapRaw {
            rid,
            token: Token::for_row(TableId::ImplMap, rid),
            mapping_flags: read_le_at::<u16>(data, offset)?,
            member_forwarded: CodedIndex::read(data, offset, info, CodedIndexType::MemberForwarded)?,
            import_name: read_le_at_dyn(data, offset, info.is_large_str())?,
            import_scope: read_le_at_dyn(data, offset, info.is_large(TableId::ModuleRef))?,
        })
    }
}
