//! Raw row readers for the metadata tables a `.winmd` consumer needs.
//!
//! Each row type implements [`crate::metadata::streams::RowDefinition`],
//! pairing a width formula with a reader; the two must consume identical
//! byte counts. Tables outside this set (assembly identity, events,
//! properties, debug data) are sized but never materialized, see
//! [`crate::metadata::streams::TableInfo::row_size`].

mod classlayout;
mod constant;
mod customattribute;
mod field;
mod fieldlayout;
mod implmap;
mod interfaceimpl;
mod memberref;
mod methoddef;
mod module;
mod moduleref;
mod nestedclass;
mod param;
mod typedef;
mod typeref;

pub use classlayout::ClassLayoutRaw;
pub use constant::ConstantRaw;
pub use customattribute::CustomAttributeRaw;
pub use field::{FieldAttributes, FieldRaw};
pub use fieldlayout::FieldLayoutRaw;
pub use implmap::{ImplMapRaw, PInvokeAttributes, PInvokeCallConv};
pub use interfaceimpl::InterfaceImplRaw;
pub use memberref::MemberRefRaw;
pub use methoddef::{MethodAttributes, MethodDefRaw};
pub use module::ModuleRaw;
pub use moduleref::ModuleRefRaw;
pub use nestedclass::NestedClassRaw;
pub use param::{ParamAttributes, ParamRaw};
pub use typedef::{TypeAttributes, TypeDefRaw};
pub use typeref::TypeRefRaw;
