//! Support fragments: the extern method container and the GUID type.
//!
//! These are the only emissions not driven by a metadata entity. They
//! exist solely to keep the generated output self-contained.

use crate::{
    collision::SymbolKind,
    emit::{CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    Result,
};

/// Emit the container struct extern methods hang off.
pub(crate) fn emit_class_decl(ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    let class = &ctx.options.class_name;
    if !ctx.resolver.should_emit(class, SymbolKind::Class) {
        return Ok((None, Vec::new()));
    }

    let mut w = CodeWriter::new();
    w.line("/// Container for the generated native entry points.");
    w.line("///");
    w.line("/// Extensible: user code in the same crate can add its own");
    w.line("/// `impl` blocks alongside the generated ones.");
    w.line(&format!("pub struct {class};"));

    let fragment = Fragment {
        key: EmissionKey::ClassDecl,
        path: format!("{class}.rs"),
        symbol: class.clone(),
        kind: SymbolKind::Class,
        source: w.finish(),
    };

    Ok((Some(fragment), Vec::new()))
}

/// Emit the self-contained GUID type.
pub(crate) fn emit_guid_type(ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    if !ctx.resolver.should_emit("GUID", SymbolKind::Struct) {
        return Ok((None, Vec::new()));
    }

    let mut w = CodeWriter::new();
    w.line("/// A globally unique identifier, in its four-field record form.");
    w.line("#[repr(C)]");
    w.line("#[derive(Clone, Copy, Debug, PartialEq, Eq)]");
    w.open("pub struct GUID {");
    w.line("pub data1: u32,");
    w.line("pub data2: u16,");
    w.line("pub data3: u16,");
    w.line("pub data4: [u8; 8],");
    w.close("}");
    w.blank();
    w.open("impl GUID {");
    w.line("/// Builds a GUID from its eleven integer components.");
    w.open("pub const fn from_values(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {");
    w.line("Self { data1, data2, data3, data4 }");
    w.close("}");
    w.close("}");

    let fragment = Fragment {
        key: EmissionKey::GuidType,
        path: "GUID.rs".to_string(),
        symbol: "GUID".to_string(),
        kind: SymbolKind::Struct,
        source: w.finish(),
    };

    Ok((Some(fragment), Vec::new()))
}
