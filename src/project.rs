//! Type projection.
//!
//! Maps a metadata type signature onto its ABI exact Rust type expression,
//! collecting the emission keys of everything the expression references.
//! Projection is context sensitive: struct fields keep declared types
//! verbatim and fixed arrays inline only there. The friendly rendition's
//! substitutions (booleans, safe handles, slices, delegate references) are
//! not projected here; they are planned per parameter by the method
//! emitters on top of these raw projections.

use crate::{
    collision::{CollisionResolver, SymbolKind},
    emit::EmissionKey,
    metadata::{
        index::MetadataIndex,
        model::{TypeDecl, TypeKind},
        signatures::{TypeName, TypeSig},
    },
};

/// Where the projected type appears.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Context {
    /// A struct or union field; fixed arrays inline here
    Field,
    /// A method parameter
    Param,
    /// A method return type
    Return,
}

/// Map a type's shape onto the collision resolver's symbol vocabulary.
#[must_use]
pub fn symbol_kind(decl: &TypeDecl) -> SymbolKind {
    match decl.kind {
        TypeKind::Struct => SymbolKind::Struct,
        TypeKind::Union => SymbolKind::Union,
        TypeKind::Enum => SymbolKind::Enum,
        TypeKind::Interface => SymbolKind::Interface,
        TypeKind::Delegate => SymbolKind::Delegate,
        TypeKind::HandleTypedef => SymbolKind::Handle,
        TypeKind::Class => SymbolKind::Class,
    }
}

/// The item name a type declares under.
///
/// Top level types keep their metadata name. Nested types (the anonymous
/// unions inside Win32 structs) are emitted as sibling items named
/// `<Outer>_<index>`, where the index is the position in the encloser's
/// nested list; the enclosing chain composes for nested-of-nested. Both
/// the struct emitter (for the item header) and the projector (for field
/// references) derive the name from here, so the two always agree.
#[must_use]
pub fn nested_item_name(index: &MetadataIndex, decl: &TypeDecl) -> String {
    let Some(outer_token) = decl.enclosing else {
        return decl.name.clone();
    };

    let Some(outer) = index.type_by_token(outer_token) else {
        return decl.name.clone();
    };

    let position = outer
        .nested
        .iter()
        .position(|token| *token == decl.token)
        .unwrap_or(0);

    format!("{}_{}", nested_item_name(index, outer), position)
}

/// Projects type signatures into Rust type expressions.
pub(crate) struct Projector<'a> {
    pub index: &'a MetadataIndex,
    pub resolver: &'a CollisionResolver,
}

impl<'a> Projector<'a> {
    /// Render `sig` for the given context, pushing the emission keys of
    /// referenced entities into `deps`.
    pub fn project(&self, sig: &TypeSig, ctx: Context, deps: &mut Vec<EmissionKey>) -> String {
        match sig {
            TypeSig::Void => "()".to_string(),
            TypeSig::Bool => "bool".to_string(),
            TypeSig::Char => "u16".to_string(),
            TypeSig::I1 => "i8".to_string(),
            TypeSig::U1 => "u8".to_string(),
            TypeSig::I2 => "i16".to_string(),
            TypeSig::U2 => "u16".to_string(),
            TypeSig::I4 => "i32".to_string(),
            TypeSig::U4 => "u32".to_string(),
            TypeSig::I8 => "i64".to_string(),
            TypeSig::U8 => "u64".to_string(),
            TypeSig::R4 => "f32".to_string(),
            TypeSig::R8 => "f64".to_string(),
            TypeSig::ISize => "isize".to_string(),
            TypeSig::USize => "usize".to_string(),
            TypeSig::String => "*const u16".to_string(),
            TypeSig::Ptr(inner) => match inner.as_ref() {
                TypeSig::Void => "*mut ::core::ffi::c_void".to_string(),
                other => format!("*mut {}", self.project(other, Context::Field, deps)),
            },
            TypeSig::ByRef(inner) => match inner.as_ref() {
                TypeSig::Void => "*mut ::core::ffi::c_void".to_string(),
                other => format!("*mut {}", self.project(other, Context::Field, deps)),
            },
            TypeSig::SzArray(inner) => {
                format!("*mut {}", self.project(inner, Context::Field, deps))
            }
            TypeSig::FixedArray(inner, length) => {
                let element = self.project(inner, Context::Field, deps);
                if ctx == Context::Field {
                    format!("[{element}; {length}]")
                } else {
                    format!("*mut {element}")
                }
            }
            TypeSig::Named(name) => self.project_named(name, deps),
        }
    }

    fn project_named(&self, name: &TypeName, deps: &mut Vec<EmissionKey>) -> String {
        // 64-bit unions used as scalars collapse to native integers.
        match name.name.as_str() {
            "LARGE_INTEGER" => return "i64".to_string(),
            "ULARGE_INTEGER" => return "u64".to_string(),
            _ => {}
        }

        if name.namespace == "System" && name.name == "Guid" {
            deps.push(EmissionKey::GuidType);
            return self.resolver.reference("GUID", SymbolKind::Struct);
        }

        let decl = if name.namespace.is_empty() {
            self.index.find_type_anywhere(&name.name)
        } else {
            self.index.find_type(&name.namespace, &name.name)
        };

        let Some(decl) = decl else {
            // A type outside this metadata, e.g. an incidental WinRT
            // reference. Render it fully qualified and leave it alone.
            if name.namespace.is_empty() {
                return crate::emit::escape_ident(&name.name);
            }
            let mut path = String::from("crate");
            for segment in name.namespace.split('.') {
                path.push_str("::");
                path.push_str(segment);
            }
            path.push_str("::");
            path.push_str(&name.name);
            return path;
        };

        let anchor = self
            .index
            .top_level_of(decl.token)
            .map(|ancestor| ancestor.token)
            .unwrap_or(decl.token);
        deps.push(EmissionKey::Type(anchor));

        // Nested types go by their positional sibling name, which lives in
        // the same fragment as every reference to it.
        if decl.enclosing.is_some() {
            return nested_item_name(self.index, decl);
        }

        self.resolver.reference(&decl.name, symbol_kind(decl))
    }
}
