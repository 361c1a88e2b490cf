//! Per-kind source emitters.
//!
//! Every emission is identified by an [`EmissionKey`]; the dispatch in
//! [`emit`] routes a key to its emitter, which renders one [`Fragment`] and
//! reports the keys of everything it referenced. Emitters never recurse
//! into each other; discovered dependencies go back onto the accumulator's
//! pending queue, which is what keeps cyclic reference graphs terminating.

mod constants;
mod delegates;
mod enums;
mod interfaces;
mod methods;
mod safehandles;
mod structs;
mod support;
mod writer;

pub use writer::CodeWriter;

use crate::{
    collision::{CollisionResolver, SymbolKind},
    generator::GeneratorOptions,
    metadata::{index::MetadataIndex, model::TypeKind, token::Token},
    Result,
};

/// Stable identity of one emitted fragment.
///
/// A key emitted twice yields exactly one fragment; the raw and friendly
/// renditions of a method are distinct keys by design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmissionKey {
    /// A declared type (struct, union, enum, interface, delegate, handle)
    Type(Token),
    /// The raw extern rendition of a method
    Method(Token),
    /// The friendly rendition of a method
    FriendlyMethod(Token),
    /// A constant field
    Constant(Token),
    /// The safe-handle wrapper of a handle typedef
    SafeHandle(Token),
    /// The container struct extern methods hang off
    ClassDecl,
    /// The self-contained GUID support type
    GuidType,
}

/// One emitted source fragment.
#[derive(Clone, Debug)]
pub struct Fragment {
    /// The key this fragment was emitted under
    pub key: EmissionKey,
    /// Logical file path the fragment belongs to
    pub path: String,
    /// The short name of the declared symbol
    pub symbol: String,
    /// The kind of the declared symbol
    pub kind: SymbolKind,
    /// The source text
    pub source: String,
}

/// Shared read context for one emission.
pub(crate) struct EmitCtx<'a> {
    pub index: &'a MetadataIndex,
    pub options: &'a GeneratorOptions,
    pub resolver: &'a CollisionResolver,
}

/// What one emission produced: at most one fragment, plus the keys of
/// everything it discovered.
pub(crate) type EmitOutcome = (Option<Fragment>, Vec<EmissionKey>);

/// Emit the fragment for `key`.
///
/// The fragment is `None` when the emission is suppressed (the consuming
/// compilation or an upstream generator already declares the entity) or the
/// key has no standalone rendition (nested types, `Apis` containers,
/// constants that live inside an enum body); discovered dependencies are
/// reported either way.
///
/// # Errors
/// Returns an error when the key does not resolve into the loaded metadata.
pub(crate) fn emit(key: EmissionKey, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    match key {
        EmissionKey::Type(token) => {
            let Some(decl) = ctx.index.type_by_token(token) else {
                return Err(crate::Error::TypeNotFound(token));
            };

            if decl.enclosing.is_some() {
                // Nested types ride along inside their top level ancestor.
                let anchor = ctx
                    .index
                    .top_level_of(token)
                    .map(|ancestor| ancestor.token);
                return Ok((None, anchor.map(EmissionKey::Type).into_iter().collect()));
            }

            match decl.kind {
                TypeKind::Struct | TypeKind::Union => structs::emit_struct(decl, ctx),
                TypeKind::HandleTypedef => structs::emit_handle_typedef(decl, ctx),
                TypeKind::Enum => enums::emit_enum(decl, ctx),
                TypeKind::Interface => interfaces::emit_interface(decl, ctx),
                TypeKind::Delegate => delegates::emit_delegate(decl, ctx),
                TypeKind::Class => Ok((None, Vec::new())),
            }
        }
        EmissionKey::Method(token) => methods::emit_extern(token, ctx),
        EmissionKey::FriendlyMethod(token) => methods::emit_friendly(token, ctx),
        EmissionKey::Constant(token) => constants::emit_constant(token, ctx),
        EmissionKey::SafeHandle(token) => safehandles::emit_safe_handle(token, ctx),
        EmissionKey::ClassDecl => support::emit_class_decl(ctx),
        EmissionKey::GuidType => support::emit_guid_type(ctx),
    }
}

/// Keywords that need `r#` escaping when they appear as Win32 identifiers.
const KEYWORDS: &[&str] = &[
    "as", "abstract", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Escape an identifier that collides with a Rust keyword.
///
/// The spelling is kept verbatim behind `r#`; the few keywords that cannot
/// be raw identifiers get a trailing underscore instead.
pub(crate) fn escape_ident(name: &str) -> String {
    if matches!(name, "self" | "Self" | "super" | "crate") {
        return format!("{name}_");
    }

    if KEYWORDS.contains(&name) {
        return format!("r#{name}");
    }

    name.to_string()
}

/// Convert a Win32 PascalCase name to the snake_case spelling used by
/// friendly overloads.
pub(crate) fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::new();

    for (idx, ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            let prev_lower =
                idx > 0 && (chars[idx - 1].is_ascii_lowercase() || chars[idx - 1].is_ascii_digit());
            let prev_upper = idx > 0 && chars[idx - 1].is_ascii_uppercase();
            let next_lower = idx + 1 < chars.len() && chars[idx + 1].is_ascii_lowercase();

            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(*ch);
        }
    }

    out
}

/// The friendly spelling of a native method name.
///
/// Falls back to a suffix when the native name has no uppercase letters to
/// fold, so the two renditions never collide.
pub(crate) fn friendly_name(name: &str) -> String {
    let snake = to_snake_case(name);
    if snake == name {
        format!("{snake}_safe")
    } else {
        snake
    }
}
