//! Constant emission.
//!
//! Constants are typed Rust `const` items. The special payloads each get
//! their target literal form: IEEE specials use the core float constants,
//! GUIDs construct through the support type's eleven-integer constructor,
//! handle typed sentinels construct the handle typedef, and UTF-16 string
//! constants become NUL terminated buffers with durable storage.

use crate::{
    collision::SymbolKind,
    emit::{CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    metadata::{
        attributes::GuidValue,
        model::{ConstantValue, FieldDecl, TypeKind},
        signatures::TypeSig,
        token::Token,
    },
    project::{Context, Projector},
    Result,
};

/// Render an integral constant with the suffix of its target type.
pub(crate) fn integer_literal(value: &ConstantValue, rust_type: &str) -> String {
    match value.as_i64() {
        Some(v) => format!("{v}{rust_type}"),
        None => match value {
            ConstantValue::U8(v) => format!("{v}{rust_type}"),
            ConstantValue::Bool(v) => format!("{v}"),
            other => format!("0{rust_type} /* {other:?} */"),
        },
    }
}

fn float_literal(value: f64, rust_type: &str) -> String {
    if value.is_nan() {
        format!("{rust_type}::NAN")
    } else if value == f64::INFINITY {
        format!("{rust_type}::INFINITY")
    } else if value == f64::NEG_INFINITY {
        format!("{rust_type}::NEG_INFINITY")
    } else {
        format!("{value:?}{rust_type}")
    }
}

pub(crate) fn guid_expression(guid_ref: &str, value: &GuidValue) -> String {
    let bytes = value
        .data4
        .iter()
        .map(|byte| format!("{byte:#04x}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{guid_ref}::from_values({data1:#010x}, {data2:#06x}, {data3:#06x}, [{bytes}])",
        data1 = value.data1,
        data2 = value.data2,
        data3 = value.data3,
    )
}

/// Emit one constant.
pub(crate) fn emit_constant(token: Token, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    let Some((_, field)) = ctx.index.constant_by_token(token) else {
        return Err(crate::Error::TypeNotFound(token));
    };

    // Constants adopted by an enum body are emitted there, not standalone.
    if let Some(enum_name) = field.associated_enum() {
        if let Some(enum_decl) = ctx.index.find_type_anywhere(enum_name) {
            return Ok((None, vec![EmissionKey::Type(enum_decl.token)]));
        }
    }

    if !ctx.resolver.should_emit(&field.name, SymbolKind::Constant) {
        return Ok((None, Vec::new()));
    }

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = Vec::new();
    let mut w = CodeWriter::new();

    let declaration = render_constant(field, ctx, &projector, &mut deps)?;
    w.line("#[allow(non_upper_case_globals)]");
    w.line(&declaration);

    let fragment = Fragment {
        key: EmissionKey::Constant(token),
        path: format!("{}.rs", field.name),
        symbol: field.name.clone(),
        kind: SymbolKind::Constant,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}

fn render_constant(
    field: &FieldDecl,
    ctx: &EmitCtx<'_>,
    projector: &Projector<'_>,
    deps: &mut Vec<EmissionKey>,
) -> Result<String> {
    let name = &field.name;

    // GUID constants carry their value in an attribute, not the Constant
    // table.
    if let Some(guid) = field.guid() {
        deps.push(EmissionKey::GuidType);
        let guid_ref = ctx.resolver.reference("GUID", SymbolKind::Struct);
        return Ok(format!(
            "pub const {name}: {guid_ref} = {expr};",
            expr = guid_expression(&guid_ref, &guid)
        ));
    }

    let Some(value) = field.constant.as_ref() else {
        return Err(malformed_error!("Constant '{}' has no payload", name));
    };

    match (&field.sig, value) {
        // UTF-16 string constants become durable NUL terminated buffers.
        (_, ConstantValue::String(text)) => {
            let mut units: Vec<u16> = text.encode_utf16().collect();
            units.push(0);
            let rendered = units
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            Ok(format!(
                "pub const {name}: &[u16; {len}] = &[{rendered}];",
                len = units.len()
            ))
        }
        (TypeSig::R4, ConstantValue::R4(v)) => Ok(format!(
            "pub const {name}: f32 = {};",
            float_literal(f64::from(*v), "f32")
        )),
        (TypeSig::R8, ConstantValue::R8(v)) => Ok(format!(
            "pub const {name}: f64 = {};",
            float_literal(*v, "f64")
        )),
        (TypeSig::Named(type_name), value) => {
            // Handle typed sentinels and enum typed constants construct
            // their newtype over the underlying payload.
            let Some(decl) = (if type_name.namespace.is_empty() {
                ctx.index.find_type_anywhere(&type_name.name)
            } else {
                ctx.index.find_type(&type_name.namespace, &type_name.name)
            }) else {
                return Err(malformed_error!(
                    "Constant '{}' has unresolvable type '{}'",
                    name,
                    type_name
                ));
            };

            deps.push(EmissionKey::Type(decl.token));
            let type_ref = projector.project(&field.sig, Context::Field, deps);

            let underlying = match decl.kind {
                TypeKind::HandleTypedef => decl
                    .fields
                    .first()
                    .map(|f| projector.project(&f.sig, Context::Field, deps))
                    .unwrap_or_else(|| "isize".to_string()),
                TypeKind::Enum => decl
                    .enum_underlying()
                    .map(|sig| projector.project(sig, Context::Field, deps))
                    .unwrap_or_else(|| "i32".to_string()),
                _ => {
                    return Err(malformed_error!(
                        "Constant '{}' typed as non-scalar '{}'",
                        name,
                        type_name
                    ))
                }
            };

            let inner = if underlying.starts_with('*') {
                format!("{} as {underlying}", value.as_i64().unwrap_or(0))
            } else {
                integer_literal(value, &underlying)
            };

            Ok(format!("pub const {name}: {type_ref} = {type_ref}({inner});"))
        }
        (sig, value) => {
            let rust = projector.project(sig, Context::Field, deps);
            Ok(format!(
                "pub const {name}: {rust} = {};",
                integer_literal(value, &rust)
            ))
        }
    }
}
