//! Tables stream (`#~`) access.
//!
//! The `#~` stream holds the metadata tables. Its header encodes which
//! tables are present, their row counts and the width of heap indexes;
//! column widths then follow from those counts ([`TableInfo`]). Row parsing
//! itself is delegated to the per-table [`RowDefinition`] implementations in
//! [`crate::metadata::tables`]; this module knows the size of every standard
//! table so it can locate each present table within the stream, including
//! tables it never materializes.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6 and II.22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::{EnumCount, EnumIter, FromRepr, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::token::Token,
    Error::OutOfBounds,
    Result,
};

/// Identifiers of the standard metadata tables.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, FromRepr)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRva = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOs = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOs = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
    Document = 0x30,
    MethodDebugInformation = 0x31,
    LocalScope = 0x32,
    LocalVariable = 0x33,
    LocalConstant = 0x34,
    ImportScope = 0x35,
    StateMachineMethod = 0x36,
    CustomDebugInformation = 0x37,
}

/// Highest table id plus one, the size of per-table lookup vectors.
pub(crate) const TABLE_SLOTS: usize = 0x38;

/// The coded index families defined by ECMA-335 II.24.2.6.
///
/// A coded index packs a table selector into the low bits of a row index so
/// one column can reference several tables.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum CodedIndexType {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
    HasCustomDebugInformation,
}

impl CodedIndexType {
    /// The tables this family can reference, in tag order.
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are unused by writers but part of the encoding.
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
            CodedIndexType::HasCustomDebugInformation => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
                TableId::Document,
                TableId::LocalScope,
                TableId::LocalVariable,
                TableId::LocalConstant,
                TableId::ImportScope,
            ],
        }
    }

    fn tag_bits(&self) -> u8 {
        let tables = self.tables().len() as u32;
        (32 - (tables - 1).leading_zeros()) as u8
    }
}

/// A decoded coded index: target table, 1-based row, computed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodedIndex {
    /// The table this index refers to
    pub tag: TableId,
    /// The 1-based row within that table; 0 is a null reference
    pub row: u32,
    /// The equivalent metadata token
    pub token: Token,
}

impl CodedIndex {
    /// Construct a coded index from its components, computing the token
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::for_row(tag, row),
        }
    }

    /// Read and decode a coded index column
    ///
    /// ## Arguments
    /// * 'data'    - The table data to read from
    /// * 'offset'  - Read position, advanced past the column
    /// * 'info'    - Table size information for width decisions
    /// * '`ci_type`' - The coded index family of this column
    ///
    /// # Errors
    /// Returns an error if the read runs out of bounds or the tag selects a
    /// table outside the family.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let value = if info.coded_index_bits(ci_type) > 16 {
            read_le_at::<u32>(data, offset)?
        } else {
            u32::from(read_le_at::<u16>(data, offset)?)
        };

        let tables = ci_type.tables();
        let tag_bits = ci_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);
        let row = value >> tag_bits;

        let Some(table) = tables.get(tag as usize) else {
            return Err(OutOfBounds);
        };

        Ok(CodedIndex::new(*table, row))
    }
}

/// Row count and index width data for one table.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// The count of rows in this table
    pub rows: u32,
    /// True when indexes into this table need 4 bytes instead of 2
    pub is_large: bool,
}

/// Row counts and reference widths for all tables of one metadata blob.
///
/// Every column width decision in the row readers funnels through this type.
#[derive(Clone, Default)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Build a `TableInfo` from the `#~` header
    ///
    /// ## Arguments
    /// * 'data' - The `#~` stream, starting at its header
    /// * '`valid_bitvec`' - Bit vector of present tables
    ///
    /// # Errors
    /// Returns an error if the header is truncated.
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        let mut rows = vec![TableRowInfo::default(); TABLE_SLOTS];
        let mut next_row_offset = 24;

        for bit in 0..64_usize {
            if (valid_bitvec & (1u64 << bit)) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            if bit < TABLE_SLOTS {
                rows[bit] = TableRowInfo {
                    rows: row_count,
                    is_large: row_count > u32::from(u16::MAX),
                };
            }
        }

        let heap_size_flags = read_le::<u8>(&data[6..])?;
        let mut info = TableInfo {
            rows,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 1 == 1,
            is_large_index_guid: heap_size_flags & 2 == 2,
            is_large_index_blob: heap_size_flags & 4 == 4,
        };

        info.calculate_coded_index_bits();
        Ok(info)
    }

    /// Test-only constructor for crafted row readers
    ///
    /// ## Arguments
    /// * '`valid_tables`' - (table, row count) pairs of the present tables
    /// * '`large_str`' / '`large_blob`' / '`large_guid`' - Heap index widths
    #[cfg(test)]
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut info = TableInfo {
            rows: vec![TableRowInfo::default(); TABLE_SLOTS],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for (table, count) in valid_tables {
            info.rows[*table as usize] = TableRowInfo {
                rows: *count,
                is_large: *count > u32::from(u16::MAX),
            };
        }

        info.calculate_coded_index_bits();
        info
    }

    /// Row count of a table, zero when absent
    #[must_use]
    pub fn row_count(&self, id: TableId) -> u32 {
        self.rows[id as usize].rows
    }

    /// True when indexes into the table need 4 bytes
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize].is_large
    }

    /// True when `#Strings` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// True when `#GUID` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// True when `#Blob` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Byte width of `#Strings` indexes
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Byte width of `#GUID` indexes
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Byte width of `#Blob` indexes
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Byte width of indexes into a specific table
    #[must_use]
    pub fn table_index_bytes(&self, id: TableId) -> u8 {
        if self.rows[id as usize].is_large {
            4
        } else {
            2
        }
    }

    /// Cached bit width of a coded index family
    #[must_use]
    pub fn coded_index_bits(&self, ci_type: CodedIndexType) -> u8 {
        self.coded_indexes[ci_type as usize]
    }

    /// Cached byte width of a coded index family
    #[must_use]
    pub fn coded_index_bytes(&self, ci_type: CodedIndexType) -> u8 {
        if self.coded_indexes[ci_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    fn calculate_coded_index_bits(&mut self) {
        for ci_type in CodedIndexType::iter() {
            let max_rows = ci_type
                .tables()
                .iter()
                .map(|table| self.rows[*table as usize].rows)
                .max()
                .unwrap_or(0);

            let row_bits = if max_rows == 0 {
                1
            } else {
                (32 - max_rows.leading_zeros()) as u8
            };

            self.coded_indexes[ci_type as usize] = row_bits + ci_type.tag_bits();
        }
    }

    /// Row size in bytes of any standard table under these widths.
    ///
    /// Needed to walk the sequential table layout even across tables this
    /// library never materializes.
    #[must_use]
    pub fn row_size(&self, id: TableId) -> u32 {
        let str = u32::from(self.str_bytes());
        let guid = u32::from(self.guid_bytes());
        let blob = u32::from(self.blob_bytes());
        let idx = |table: TableId| u32::from(self.table_index_bytes(table));
        let ci = |family: CodedIndexType| u32::from(self.coded_index_bytes(family));

        match id {
            TableId::Module => 2 + str + 3 * guid,
            TableId::TypeRef => ci(CodedIndexType::ResolutionScope) + 2 * str,
            TableId::TypeDef => {
                4 + 2 * str
                    + ci(CodedIndexType::TypeDefOrRef)
                    + idx(TableId::Field)
                    + idx(TableId::MethodDef)
            }
            TableId::FieldPtr => idx(TableId::Field),
            TableId::Field => 2 + str + blob,
            TableId::MethodPtr => idx(TableId::MethodDef),
            TableId::MethodDef => 8 + str + blob + idx(TableId::Param),
            TableId::ParamPtr => idx(TableId::Param),
            TableId::Param => 4 + str,
            TableId::InterfaceImpl => idx(TableId::TypeDef) + ci(CodedIndexType::TypeDefOrRef),
            TableId::MemberRef => ci(CodedIndexType::MemberRefParent) + str + blob,
            TableId::Constant => 2 + ci(CodedIndexType::HasConstant) + blob,
            TableId::CustomAttribute => {
                ci(CodedIndexType::HasCustomAttribute)
                    + ci(CodedIndexType::CustomAttributeType)
                    + blob
            }
            TableId::FieldMarshal => ci(CodedIndexType::HasFieldMarshal) + blob,
            TableId::DeclSecurity => 2 + ci(CodedIndexType::HasDeclSecurity) + blob,
            TableId::ClassLayout => 6 + idx(TableId::TypeDef),
            TableId::FieldLayout => 4 + idx(TableId::Field),
            TableId::StandAloneSig => blob,
            TableId::EventMap => idx(TableId::TypeDef) + idx(TableId::Event),
            TableId::EventPtr => idx(TableId::Event),
            TableId::Event => 2 + str + ci(CodedIndexType::TypeDefOrRef),
            TableId::PropertyMap => idx(TableId::TypeDef) + idx(TableId::Property),
            TableId::PropertyPtr => idx(TableId::Property),
            TableId::Property => 2 + str + blob,
            TableId::MethodSemantics => 2 + idx(TableId::MethodDef) + ci(CodedIndexType::HasSemantics),
            TableId::MethodImpl => idx(TableId::TypeDef) + 2 * ci(CodedIndexType::MethodDefOrRef),
            TableId::ModuleRef => str,
            TableId::TypeSpec => blob,
            TableId::ImplMap => {
                2 + ci(CodedIndexType::MemberForwarded) + str + idx(TableId::ModuleRef)
            }
            TableId::FieldRva => 4 + idx(TableId::Field),
            TableId::EncLog => 8,
            TableId::EncMap => 4,
            TableId::Assembly => 16 + blob + 2 * str,
            TableId::AssemblyProcessor => 4,
            TableId::AssemblyOs => 12,
            TableId::AssemblyRef => 12 + 2 * blob + 2 * str,
            TableId::AssemblyRefProcessor => 4 + idx(TableId::AssemblyRef),
            TableId::AssemblyRefOs => 12 + idx(TableId::AssemblyRef),
            TableId::File => 4 + str + blob,
            TableId::ExportedType => 8 + 2 * str + ci(CodedIndexType::Implementation),
            TableId::ManifestResource => 8 + str + ci(CodedIndexType::Implementation),
            TableId::NestedClass => 2 * idx(TableId::TypeDef),
            TableId::GenericParam => 4 + ci(CodedIndexType::TypeOrMethodDef) + str,
            TableId::MethodSpec => ci(CodedIndexType::MethodDefOrRef) + blob,
            TableId::GenericParamConstraint => {
                idx(TableId::GenericParam) + ci(CodedIndexType::TypeDefOrRef)
            }
            TableId::Document => 2 * blob + 2 * guid,
            TableId::MethodDebugInformation => idx(TableId::Document) + blob,
            TableId::LocalScope => {
                idx(TableId::MethodDef)
                    + idx(TableId::ImportScope)
                    + idx(TableId::LocalVariable)
                    + idx(TableId::LocalConstant)
                    + 8
            }
            TableId::LocalVariable => 4 + str,
            TableId::LocalConstant => str + blob,
            TableId::ImportScope => idx(TableId::ImportScope) + blob,
            TableId::StateMachineMethod => 2 * idx(TableId::MethodDef),
            TableId::CustomDebugInformation => {
                ci(CodedIndexType::HasCustomDebugInformation) + guid + blob
            }
        }
    }
}

/// Per-table row reader contract.
///
/// Implemented by the raw row types in [`crate::metadata::tables`]. The two
/// methods must agree: `read_row` consumes exactly `row_size` bytes.
pub trait RowDefinition<'a>: Sized {
    /// Size in bytes of one row under the given widths
    fn row_size(info: &TableInfo) -> u32;

    /// Parse the row with the given 1-based `rid`
    ///
    /// # Errors
    /// Returns an error if the row data is truncated or malformed.
    fn read_row(data: &'a [u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self>;
}

/// Lazy, bounds checked access to the rows of one table.
pub struct MetadataTable<'a, T: RowDefinition<'a>> {
    data: &'a [u8],
    info: &'a TableInfo,
    rows: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: RowDefinition<'a>> MetadataTable<'a, T> {
    /// Create a table view over `data` holding `rows` rows
    ///
    /// # Errors
    /// Returns an error if `data` cannot hold the declared rows.
    pub fn new(data: &'a [u8], rows: u32, info: &'a TableInfo) -> Result<Self> {
        let needed = T::row_size(info) as usize * rows as usize;
        if needed > data.len() {
            return Err(OutOfBounds);
        }

        Ok(MetadataTable {
            data,
            info,
            rows,
            _marker: std::marker::PhantomData,
        })
    }

    /// The number of rows in this table
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.rows
    }

    /// Parse the row with the given 1-based `rid`
    #[must_use]
    pub fn get(&self, rid: u32) -> Option<T> {
        if rid == 0 || rid > self.rows {
            return None;
        }

        let mut offset = T::row_size(self.info) as usize * (rid - 1) as usize;
        T::read_row(self.data, &mut offset, rid, self.info).ok()
    }

    /// Iterate all rows in rid order
    pub fn iter(&self) -> impl Iterator<Item = T> + use<'_, 'a, T> {
        (1..=self.rows).filter_map(move |rid| self.get(rid))
    }
}

/// The parsed `#~` stream: header facts plus the location of each table.
pub struct TablesStream<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfo,
    data: &'a [u8],
    offsets: Vec<Option<usize>>,
}

impl<'a> TablesStream<'a> {
    /// Parse the `#~` stream
    ///
    /// ## Arguments
    /// * 'data' - The stream bytes, starting at the header
    ///
    /// # Errors
    /// Returns an error if the header is truncated, a table id outside the
    /// standard set is marked present, or the declared rows exceed the
    /// stream.
    pub fn from(data: &'a [u8]) -> Result<TablesStream<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }
        if valid >> TABLE_SLOTS != 0 {
            return Err(malformed_error!(
                "Unknown metadata tables present - 0x{:016x}",
                valid
            ));
        }

        let info = TableInfo::new(data, valid)?;
        let sorted = read_le::<u64>(&data[16..])?;

        let mut offsets = vec![None; TABLE_SLOTS];
        let mut cursor = 24 + valid.count_ones() as usize * 4;

        for table_id in TableId::iter() {
            if (valid & (1u64 << table_id as usize)) == 0 {
                continue;
            }

            let rows = info.row_count(table_id);
            let size = info.row_size(table_id) as usize * rows as usize;
            if cursor + size > data.len() {
                return Err(malformed_error!(
                    "Table {:?} with {} rows runs past the stream",
                    table_id,
                    rows
                ));
            }

            offsets[table_id as usize] = Some(cursor);
            cursor += size;
        }

        Ok(TablesStream {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            valid,
            sorted,
            info,
            data,
            offsets,
        })
    }

    /// True when the given table is present
    #[must_use]
    pub fn has_table(&self, id: TableId) -> bool {
        self.offsets[id as usize].is_some()
    }

    /// Row count of a table, zero when absent
    #[must_use]
    pub fn row_count(&self, id: TableId) -> u32 {
        self.info.row_count(id)
    }

    /// Typed access to a present table.
    ///
    /// The type parameter must be the raw row type matching `id`; the row
    /// readers in [`crate::metadata::tables`] document their table.
    #[must_use]
    pub fn table<'s, T: RowDefinition<'s>>(&'s self, id: TableId) -> Option<MetadataTable<'s, T>> {
        let offset = self.offsets[id as usize]?;
        MetadataTable::new(&self.data[offset..], self.info.row_count(id), &self.info).ok()
    }
}
