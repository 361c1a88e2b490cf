//! The owned metadata model.
//!
//! The loader folds raw table rows into these owned entities once per
//! session; everything downstream (projection, handle policy, emission)
//! works against this model and never touches the physical tables again.
//! Tests assemble the same model directly, which keeps the emission engine
//! independent of any binary input.

use crate::metadata::{
    attributes::{AttrDecl, GuidValue},
    signatures::{MethodSig, TypeName, TypeSig},
    tables::{FieldAttributes, MethodAttributes, ParamAttributes, PInvokeAttributes,
        PInvokeCallConv},
    token::Token,
};

/// The shape of a declared type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Sequential layout value type
    Struct,
    /// Explicit layout value type with overlapping fields
    Union,
    /// Integer backed enumeration
    Enum,
    /// Function pointer type
    Delegate,
    /// COM interface
    Interface,
    /// Reference type; in a `.winmd` these are the `Apis` containers
    Class,
    /// Value type wrapping a single scalar that names an OS resource
    HandleTypedef,
}

/// Field layout discipline of a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeLayout {
    /// Runtime chosen layout
    Auto,
    /// Declaration order, with an optional packing override
    Sequential {
        /// Packing from the `ClassLayout` table, if any
        pack: Option<u16>,
    },
    /// Explicit offsets from the `FieldLayout` table
    Explicit,
}

/// A compile time constant payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    /// Boolean constant
    Bool(bool),
    /// UTF-16 code unit constant
    Char(u16),
    /// Signed 8-bit constant
    I1(i8),
    /// Unsigned 8-bit constant
    U1(u8),
    /// Signed 16-bit constant
    I2(i16),
    /// Unsigned 16-bit constant
    U2(u16),
    /// Signed 32-bit constant
    I4(i32),
    /// Unsigned 32-bit constant
    U4(u32),
    /// Signed 64-bit constant
    I8(i64),
    /// Unsigned 64-bit constant
    U8(u64),
    /// 32-bit float constant, IEEE specials preserved bit-exactly
    R4(f32),
    /// 64-bit float constant, IEEE specials preserved bit-exactly
    R8(f64),
    /// UTF-16 string constant
    String(String),
    /// Null reference constant
    Null,
}

impl ConstantValue {
    /// The value widened to `i64`, when it is integral
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstantValue::I1(v) => Some(i64::from(*v)),
            ConstantValue::U1(v) => Some(i64::from(*v)),
            ConstantValue::I2(v) => Some(i64::from(*v)),
            ConstantValue::U2(v) => Some(i64::from(*v)),
            ConstantValue::I4(v) => Some(i64::from(*v)),
            ConstantValue::U4(v) => Some(i64::from(*v)),
            ConstantValue::I8(v) => Some(*v),
            ConstantValue::U8(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// P/Invoke facts of an extern method.
#[derive(Clone, Debug)]
pub struct PInvokeInfo {
    /// The native module as recorded, e.g. `KERNEL32.dll`
    pub module: String,
    /// The native entry point name
    pub entry_point: String,
    /// The raw `ImplMap` flag word
    pub flags: PInvokeAttributes,
}

impl PInvokeInfo {
    /// The module name lowercased with any `.dll` suffix removed
    #[must_use]
    pub fn module_stem(&self) -> String {
        let lowered = self.module.to_ascii_lowercase();
        lowered
            .strip_suffix(".dll")
            .unwrap_or(&lowered)
            .to_string()
    }

    /// True when the import sets the thread's last-error code
    #[must_use]
    pub fn sets_last_error(&self) -> bool {
        self.flags.contains(PInvokeAttributes::SUPPORTS_LAST_ERROR)
    }

    /// The Rust ABI string for the import's calling convention
    #[must_use]
    pub fn abi(&self) -> &'static str {
        match self.flags.calling_convention() {
            PInvokeCallConv::Cdecl => "C",
            _ => "system",
        }
    }
}

/// A method parameter row.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    /// The parameter name
    pub name: String,
    /// Position; 0 is the return value, 1..n the parameters
    pub sequence: u16,
    /// The raw flag word
    pub flags: ParamAttributes,
    /// Decoded attributes attached to this parameter
    pub attrs: Vec<AttrDecl>,
}

impl ParamDecl {
    /// True when the parameter is an output
    #[must_use]
    pub fn is_out(&self) -> bool {
        self.flags.contains(ParamAttributes::OUT)
    }

    /// Array sizing facts, when present
    #[must_use]
    pub fn array_info(&self) -> Option<(Option<u16>, Option<i32>)> {
        self.attrs.iter().find_map(|attr| match attr {
            AttrDecl::NativeArrayInfo {
                count_param_index,
                count_const,
            } => Some((*count_param_index, *count_const)),
            _ => None,
        })
    }
}

/// A method of a declared type.
#[derive(Clone, Debug)]
pub struct MethodDecl {
    /// The `MethodDef` token
    pub token: Token,
    /// The method name
    pub name: String,
    /// The parsed signature
    pub sig: MethodSig,
    /// Parameter rows; sequence 0 (the return) may be absent
    pub params: Vec<ParamDecl>,
    /// The raw flag word
    pub flags: MethodAttributes,
    /// P/Invoke facts when the method forwards to a native import
    pub pinvoke: Option<PInvokeInfo>,
    /// Decoded attributes
    pub attrs: Vec<AttrDecl>,
}

impl MethodDecl {
    /// The parameter row for 1-based position `sequence`
    #[must_use]
    pub fn param(&self, sequence: u16) -> Option<&ParamDecl> {
        self.params.iter().find(|param| param.sequence == sequence)
    }

    /// The parameter name for 1-based position `sequence`, or a synthesized
    /// `param<n>` placeholder
    #[must_use]
    pub fn param_name(&self, sequence: u16) -> String {
        match self.param(sequence) {
            Some(param) if !param.name.is_empty() => param.name.clone(),
            _ => format!("param{sequence}"),
        }
    }

    /// Documentation URL, when the metadata carries one
    #[must_use]
    pub fn documentation(&self) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match attr {
            AttrDecl::Documentation { url } => Some(url.as_str()),
            _ => None,
        })
    }

    /// Minimum supported OS platform, when declared
    #[must_use]
    pub fn supported_platform(&self) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match attr {
            AttrDecl::SupportedOsPlatform { platform } => Some(platform.as_str()),
            _ => None,
        })
    }
}

/// A field of a declared type.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    /// The Field token
    pub token: Token,
    /// The field name
    pub name: String,
    /// The parsed field type
    pub sig: TypeSig,
    /// The raw flag word
    pub flags: FieldAttributes,
    /// Constant payload for literal fields
    pub constant: Option<ConstantValue>,
    /// Decoded attributes
    pub attrs: Vec<AttrDecl>,
    /// Explicit offset from the `FieldLayout` table
    pub offset: Option<u32>,
}

impl FieldDecl {
    /// True for compile time constants
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// The enum whose body adopts this constant, when tagged
    #[must_use]
    pub fn associated_enum(&self) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match attr {
            AttrDecl::AssociatedEnum { enum_name } => Some(enum_name.as_str()),
            _ => None,
        })
    }

    /// GUID payload for GUID constants
    #[must_use]
    pub fn guid(&self) -> Option<GuidValue> {
        self.attrs.iter().find_map(|attr| match attr {
            AttrDecl::Guid { value } => Some(*value),
            _ => None,
        })
    }

    /// Bitfields carved out of this backing field, in declaration order
    #[must_use]
    pub fn bitfields(&self) -> Vec<(&str, i64, i64)> {
        self.attrs
            .iter()
            .filter_map(|attr| match attr {
                AttrDecl::NativeBitfield {
                    name,
                    offset,
                    length,
                } => Some((name.as_str(), *offset, *length)),
                _ => None,
            })
            .collect()
    }
}

/// A declared type.
#[derive(Clone, Debug)]
pub struct TypeDecl {
    /// The `TypeDef` token
    pub token: Token,
    /// The declaring namespace, empty for nested types
    pub namespace: String,
    /// The type name
    pub name: String,
    /// The classified shape
    pub kind: TypeKind,
    /// The layout discipline
    pub layout: TypeLayout,
    /// The base type, when any
    pub base: Option<TypeName>,
    /// Fields in metadata order
    pub fields: Vec<FieldDecl>,
    /// Methods in metadata order
    pub methods: Vec<MethodDecl>,
    /// Implemented interfaces in declaration order
    pub interfaces: Vec<TypeName>,
    /// Decoded attributes
    pub attrs: Vec<AttrDecl>,
    /// Token of the enclosing type for nested types
    pub enclosing: Option<Token>,
    /// Tokens of the types nested inside this one
    pub nested: Vec<Token>,
    /// Interface identity from the Guid attribute
    pub guid: Option<GuidValue>,
}

impl TypeDecl {
    /// The namespace qualified name
    #[must_use]
    pub fn type_name(&self) -> TypeName {
        TypeName::new(&self.namespace, &self.name)
    }

    /// The release function named by the `RAIIFree` attribute
    #[must_use]
    pub fn raii_free(&self) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match attr {
            AttrDecl::RaiiFree { release } => Some(release.as_str()),
            _ => None,
        })
    }

    /// True for handles that name kernel namespaces
    #[must_use]
    pub fn is_namespace_handle(&self) -> bool {
        self.attrs
            .iter()
            .any(|attr| matches!(attr, AttrDecl::NamespaceHandle))
    }

    /// Raw values that denote "no handle" for this typedef
    #[must_use]
    pub fn invalid_handle_values(&self) -> Vec<i64> {
        self.attrs
            .iter()
            .filter_map(|attr| match attr {
                AttrDecl::InvalidHandleValue { value } => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// The underlying integer type of an enum, from its `value__` field
    #[must_use]
    pub fn enum_underlying(&self) -> Option<&TypeSig> {
        self.fields
            .iter()
            .find(|field| !field.flags.contains(FieldAttributes::STATIC))
            .map(|field| &field.sig)
    }

    /// The enum members: the literal fields, in order
    #[must_use]
    pub fn enum_members(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|field| field.is_literal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_stem_normalizes() {
        let info = PInvokeInfo {
            module: "KERNEL32.dll".to_string(),
            entry_point: "GetTickCount".to_string(),
            flags: PInvokeAttributes::empty(),
        };
        assert_eq!(info.module_stem(), "kernel32");
        assert_eq!(info.abi(), "system");

        let cdecl = PInvokeInfo {
            module: "msvcrt.dll".to_string(),
            entry_point: "atoi".to_string(),
            flags: PInvokeAttributes::from_bits_retain(0x0200),
        };
        assert_eq!(cdecl.abi(), "C");
    }

    #[test]
    fn constant_widening() {
        assert_eq!(ConstantValue::I4(-1).as_i64(), Some(-1));
        assert_eq!(ConstantValue::U2(9).as_i64(), Some(9));
        assert_eq!(ConstantValue::R4(1.0).as_i64(), None);
    }
}
