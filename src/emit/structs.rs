//! Struct, union and handle typedef emission.
//!
//! Field types are projected verbatim; layout and packing are reproduced
//! exactly, which is why no call-boundary substitution ever reaches a field
//! (struct layout must stay ABI exact). Nested types are rendered as
//! sibling items inside the same fragment, and bitfield attributes become
//! accessor methods over their backing scalar.

use crate::{
    collision::SymbolKind,
    emit::{escape_ident, CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    handles,
    metadata::{
        attributes::AttrDecl,
        model::{TypeDecl, TypeKind, TypeLayout},
    },
    project::{Context, Projector},
    Result,
};

fn write_type_docs(w: &mut CodeWriter, decl: &TypeDecl) {
    for attr in &decl.attrs {
        match attr {
            AttrDecl::Documentation { url } => w.line(&format!("/// [Learn more]({url})")),
            AttrDecl::SupportedOsPlatform { platform } => {
                w.line(&format!("/// Requires {platform} or later."));
            }
            AttrDecl::AlsoUsableFor { other } => {
                w.line(&format!("/// Also usable where a `{other}` is expected."));
            }
            _ => {}
        }
    }
}

/// Emit a struct or union, with its nested types as siblings.
pub(crate) fn emit_struct(decl: &TypeDecl, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    let kind = if decl.kind == TypeKind::Union {
        SymbolKind::Union
    } else {
        SymbolKind::Struct
    };

    if !ctx.resolver.should_emit(&decl.name, kind) {
        return Ok((None, Vec::new()));
    }

    let mut w = CodeWriter::new();
    let mut deps = Vec::new();
    render_struct_item(decl, ctx, &mut w, &mut deps)?;

    let fragment = Fragment {
        key: EmissionKey::Type(decl.token),
        path: format!("{}.rs", decl.name),
        symbol: decl.name.clone(),
        kind,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}

fn render_struct_item(
    decl: &TypeDecl,
    ctx: &EmitCtx<'_>,
    w: &mut CodeWriter,
    deps: &mut Vec<EmissionKey>,
) -> Result<()> {
    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };

    // Nested types emit as siblings under a positional name; the projector
    // renders field references through the same computation.
    let item_name = crate::project::nested_item_name(ctx.index, decl);

    write_type_docs(w, decl);

    let repr = match decl.layout {
        TypeLayout::Sequential { pack: Some(pack) } => format!("#[repr(C, packed({pack}))]"),
        _ => "#[repr(C)]".to_string(),
    };
    w.line(&repr);
    w.line("#[derive(Clone, Copy)]");
    w.line("#[allow(non_snake_case, non_camel_case_types)]");

    let keyword = if decl.kind == TypeKind::Union {
        "union"
    } else {
        "struct"
    };
    w.open(&format!("pub {keyword} {item_name} {{"));

    for field in &decl.fields {
        let rust = projector.project(&field.sig, Context::Field, deps);
        w.line(&format!(
            "pub {name}: {rust},",
            name = escape_ident(&field.name)
        ));
    }

    w.close("}");

    // Bitfield accessors over their backing scalars.
    let carriers: Vec<_> = decl
        .fields
        .iter()
        .filter(|field| !field.bitfields().is_empty())
        .collect();
    if !carriers.is_empty() {
        w.blank();
        w.line("#[allow(non_snake_case)]");
        w.open(&format!("impl {item_name} {{"));

        let mut first = true;
        for field in carriers {
            let backing = projector.project(&field.sig, Context::Field, deps);
            let carrier = escape_ident(&field.name);

            for (accessor, offset, length) in field.bitfields() {
                if !first {
                    w.blank();
                }
                first = false;

                let mask = (1u128 << length) - 1;
                w.open(&format!(
                    "pub fn {accessor}(&self) -> {backing} {{"
                ));
                w.line(&format!("(self.{carrier} >> {offset}) & {mask:#x}"));
                w.close("}");
                w.blank();
                w.open(&format!(
                    "pub fn set_{accessor}(&mut self, value: {backing}) {{"
                ));
                w.line(&format!(
                    "self.{carrier} = (self.{carrier} & !({mask:#x} << {offset})) | ((value & {mask:#x}) << {offset});"
                ));
                w.close("}");
            }
        }

        w.close("}");
    }

    // Nested types become sibling items in the same fragment.
    for nested_token in &decl.nested {
        let Some(nested) = ctx.index.type_by_token(*nested_token) else {
            return Err(crate::Error::TypeNotFound(*nested_token));
        };
        w.blank();
        render_struct_item(nested, ctx, w, deps)?;
    }

    Ok(())
}

/// Emit a handle typedef as a transparent newtype.
pub(crate) fn emit_handle_typedef(decl: &TypeDecl, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    if !ctx.resolver.should_emit(&decl.name, SymbolKind::Handle) {
        return Ok((None, Vec::new()));
    }

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = Vec::new();

    let payload = match decl.fields.first() {
        Some(field) => projector.project(&field.sig, Context::Field, &mut deps),
        None => "isize".to_string(),
    };
    let payload_is_pointer = payload.starts_with('*');

    let mut w = CodeWriter::new();
    write_type_docs(&mut w, decl);
    w.line("#[repr(transparent)]");
    w.line("#[derive(Clone, Copy, Debug, PartialEq, Eq)]");
    w.line("#[allow(non_camel_case_types)]");
    w.line(&format!(
        "pub struct {name}(pub {payload});",
        name = decl.name
    ));

    let invalid_values = decl.invalid_handle_values();
    if !invalid_values.is_empty() && !payload_is_pointer {
        w.blank();
        w.open(&format!("impl {name} {{", name = decl.name));
        w.line("/// A raw value that denotes \"no handle\".");
        w.line(&format!(
            "pub const INVALID: Self = Self({value} as {payload});",
            value = invalid_values[0]
        ));
        w.blank();
        w.line("/// True when the raw value is one of the declared sentinels.");
        w.open("pub fn is_invalid(self) -> bool {");
        let checks = invalid_values
            .iter()
            .map(|value| format!("self.0 as i64 == {value}"))
            .collect::<Vec<_>>()
            .join(" || ");
        w.line(&checks);
        w.close("}");
        w.close("}");
    }

    // A releasable handle brings its wrapper, and with it the release
    // method, into the output.
    if handles::descriptor_for(ctx.index, decl).is_some() {
        deps.push(EmissionKey::SafeHandle(decl.token));
    }

    let fragment = Fragment {
        key: EmissionKey::Type(decl.token),
        path: format!("{}.rs", decl.name),
        symbol: decl.name.clone(),
        kind: SymbolKind::Handle,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}
