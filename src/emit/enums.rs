//! Enum emission.
//!
//! Enums become transparent newtypes over their underlying integer with a
//! typed constant per member, so values stay strongly typed without
//! changing the ABI. Constants elsewhere in the metadata that are tagged
//! for this enum are adopted into the same fragment.

use crate::{
    collision::SymbolKind,
    emit::{constants::integer_literal, CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    metadata::model::TypeDecl,
    project::{Context, Projector},
    Result,
};

/// Emit an enum and its adopted constants.
pub(crate) fn emit_enum(decl: &TypeDecl, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    if !ctx.resolver.should_emit(&decl.name, SymbolKind::Enum) {
        return Ok((None, Vec::new()));
    }

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = Vec::new();

    let underlying = match decl.enum_underlying() {
        Some(sig) => projector.project(sig, Context::Field, &mut deps),
        None => "i32".to_string(),
    };

    let mut w = CodeWriter::new();
    w.line("#[repr(transparent)]");
    w.line("#[derive(Clone, Copy, Debug, PartialEq, Eq)]");
    w.line("#[allow(non_camel_case_types)]");
    w.line(&format!(
        "pub struct {name}(pub {underlying});",
        name = decl.name
    ));

    for member in decl.enum_members() {
        let Some(value) = member.constant.as_ref() else {
            continue;
        };

        w.line("#[allow(non_upper_case_globals)]");
        w.line(&format!(
            "pub const {member}: {name} = {name}({literal});",
            member = member.name,
            name = decl.name,
            literal = integer_literal(value, &underlying)
        ));
    }

    // Members that native headers declare elsewhere come back into the
    // enum body through their association tag.
    for (_, field) in ctx.index.constants_for_enum(&decl.name) {
        let Some(value) = field.constant.as_ref() else {
            continue;
        };

        w.line("#[allow(non_upper_case_globals)]");
        w.line(&format!(
            "pub const {member}: {name} = {name}({literal});",
            member = field.name,
            name = decl.name,
            literal = integer_literal(value, &underlying)
        ));
    }

    let fragment = Fragment {
        key: EmissionKey::Type(decl.token),
        path: format!("{}.rs", decl.name),
        symbol: decl.name.clone(),
        kind: SymbolKind::Enum,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}
