//! The physical metadata streams.
//!
//! A metadata blob carries up to five streams: `#~` (the tables),
//! `#Strings`, `#US`, `#GUID` and `#Blob`. This module exposes a typed view
//! over each stream a `.winmd` consumer needs; `#US` holds user strings for
//! IL code and has no role here.

mod blob;
mod guid;
mod strings;
mod tables;

pub use blob::Blob;
pub use guid::Guid;
pub use strings::Strings;
pub use tables::{
    CodedIndex, CodedIndexType, MetadataTable, RowDefinition, TableId, TableInfo, TableRowInfo,
    TablesStream,
};
