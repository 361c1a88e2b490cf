//! Signature blob parsing.
//!
//! Field and method signatures are compact blobs of `ELEMENT_TYPE` bytes
//! (II.23.2). The parser resolves `VALUETYPE`/`CLASS` tokens into names
//! through a caller supplied resolver, so the produced [`TypeSig`] tree is
//! self-contained and owned. The shapes a `.winmd` never uses (generics,
//! varargs, function pointers inside signatures) are rejected as malformed.

use crate::{file::parser::Parser, metadata::token::Token, Error::RecursionLimit, Result};

/// Maximum recursion depth for signature parsing
const MAX_RECURSION_DEPTH: usize = 50;

/// Element type constants used in signature blobs (II.23.1.16).
#[allow(missing_docs, non_snake_case)]
pub mod ELEMENT_TYPE {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const PTR: u8 = 0x0F;
    pub const BYREF: u8 = 0x10;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const ARRAY: u8 = 0x14;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const OBJECT: u8 = 0x1C;
    pub const SZARRAY: u8 = 0x1D;
    pub const CMOD_REQD: u8 = 0x1F;
    pub const CMOD_OPT: u8 = 0x20;
}

/// A namespace qualified type name.
///
/// This is the resolved form of the `VALUETYPE`/`CLASS` tokens inside
/// signatures; nested types carry an empty namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// The declaring namespace, empty for nested types
    pub namespace: String,
    /// The short type name
    pub name: String,
}

impl TypeName {
    /// Create a type name from namespace and name
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        TypeName {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// A parsed type from a signature blob.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeSig {
    /// No value
    Void,
    /// 8-bit boolean
    Bool,
    /// UTF-16 code unit
    Char,
    /// Signed 8-bit integer
    I1,
    /// Unsigned 8-bit integer
    U1,
    /// Signed 16-bit integer
    I2,
    /// Unsigned 16-bit integer
    U2,
    /// Signed 32-bit integer
    I4,
    /// Unsigned 32-bit integer
    U4,
    /// Signed 64-bit integer
    I8,
    /// Unsigned 64-bit integer
    U8,
    /// 32-bit float
    R4,
    /// 64-bit float
    R8,
    /// Native signed integer
    ISize,
    /// Native unsigned integer
    USize,
    /// A string constant type; only appears on literal fields
    String,
    /// Unmanaged pointer to the base type
    Ptr(Box<TypeSig>),
    /// By-reference passing of the base type
    ByRef(Box<TypeSig>),
    /// A named value or class type
    Named(TypeName),
    /// Single dimension array of unknown length
    SzArray(Box<TypeSig>),
    /// Inline array of fixed length
    FixedArray(Box<TypeSig>, u32),
}

impl TypeSig {
    /// True when this is a pointer shape (`Ptr` at the top)
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeSig::Ptr(_))
    }

    /// The named type at the top level, if any
    #[must_use]
    pub fn as_named(&self) -> Option<&TypeName> {
        match self {
            TypeSig::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// A parsed method signature.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSig {
    /// True for instance methods (interface slots)
    pub has_this: bool,
    /// The return type
    pub return_type: TypeSig,
    /// The parameter types, in order
    pub params: Vec<TypeSig>,
}

/// Parser over one signature blob.
///
/// Do not reuse an instance across blobs; each signature owns its cursor.
pub struct SignatureParser<'a, R>
where
    R: Fn(Token) -> Result<TypeName>,
{
    parser: Parser<'a>,
    resolve: R,
    depth: usize,
}

impl<'a, R> SignatureParser<'a, R>
where
    R: Fn(Token) -> Result<TypeName>,
{
    /// Create a signature parser over `data`
    ///
    /// ## Arguments
    /// * 'data'    - The signature blob
    /// * 'resolve' - Maps `TypeDefOrRef` tokens to type names
    #[must_use]
    pub fn new(data: &'a [u8], resolve: R) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            resolve,
            depth: 0,
        }
    }

    fn parse_type(&mut self) -> Result<TypeSig> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        self.skip_custom_mods()?;

        let current_byte = self.parser.read_le::<u8>()?;
        let result = match current_byte {
            ELEMENT_TYPE::VOID => TypeSig::Void,
            ELEMENT_TYPE::BOOLEAN => TypeSig::Bool,
            ELEMENT_TYPE::CHAR => TypeSig::Char,
            ELEMENT_TYPE::I1 => TypeSig::I1,
            ELEMENT_TYPE::U1 => TypeSig::U1,
            ELEMENT_TYPE::I2 => TypeSig::I2,
            ELEMENT_TYPE::U2 => TypeSig::U2,
            ELEMENT_TYPE::I4 => TypeSig::I4,
            ELEMENT_TYPE::U4 => TypeSig::U4,
            ELEMENT_TYPE::I8 => TypeSig::I8,
            ELEMENT_TYPE::U8 => TypeSig::U8,
            ELEMENT_TYPE::R4 => TypeSig::R4,
            ELEMENT_TYPE::R8 => TypeSig::R8,
            ELEMENT_TYPE::I => TypeSig::ISize,
            ELEMENT_TYPE::U => TypeSig::USize,
            ELEMENT_TYPE::STRING => TypeSig::String,
            ELEMENT_TYPE::PTR => TypeSig::Ptr(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::BYREF => TypeSig::ByRef(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::VALUETYPE | ELEMENT_TYPE::CLASS => {
                let token = self.parser.read_compressed_token()?;
                TypeSig::Named((self.resolve)(token)?)
            }
            ELEMENT_TYPE::SZARRAY => TypeSig::SzArray(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::ARRAY => {
                let base = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;
                let num_sizes = self.parser.read_compressed_uint()?;

                let mut sizes = Vec::with_capacity(num_sizes as usize);
                for _ in 0..num_sizes {
                    sizes.push(self.parser.read_compressed_uint()?);
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for _ in 0..num_lo_bounds {
                    let _ = self.parser.read_compressed_uint()?;
                }

                if rank != 1 || sizes.len() != 1 {
                    return Err(malformed_error!(
                        "Unsupported array shape - rank {} with {} sizes",
                        rank,
                        sizes.len()
                    ));
                }

                TypeSig::FixedArray(Box::new(base), sizes[0])
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported ELEMENT_TYPE - 0x{:02x}",
                    current_byte
                ))
            }
        };

        self.depth -= 1;
        Ok(result)
    }

    fn skip_custom_mods(&mut self) -> Result<()> {
        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_REQD && next_byte != ELEMENT_TYPE::CMOD_OPT {
                break;
            }

            self.parser.advance()?;
            let _ = self.parser.read_compressed_token()?;
        }

        Ok(())
    }

    /// Parse a `FieldSig` blob (II.23.2.4)
    ///
    /// # Errors
    /// Returns an error if the header byte is wrong or the type is
    /// malformed.
    pub fn parse_field_signature(&mut self) -> Result<TypeSig> {
        let header = self.parser.read_le::<u8>()?;
        if header != 0x06 {
            return Err(malformed_error!(
                "Invalid field signature header - 0x{:02x}",
                header
            ));
        }

        self.parse_type()
    }

    /// Parse a `MethodDefSig` blob (II.23.2.1)
    ///
    /// # Errors
    /// Returns an error if the signature uses generics or varargs, or any
    /// contained type is malformed.
    pub fn parse_method_signature(&mut self) -> Result<MethodSig> {
        let convention = self.parser.read_le::<u8>()?;

        if convention & 0x10 != 0 {
            return Err(malformed_error!("Generic method signatures not supported"));
        }
        if convention & 0x05 == 0x05 {
            return Err(malformed_error!("Vararg method signatures not supported"));
        }

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(self.parse_type()?);
        }

        Ok(MethodSig {
            has_this: convention & 0x20 != 0,
            return_type,
            params,
        })
    }
}
