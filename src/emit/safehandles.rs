//! Safe-handle wrapper emission.
//!
//! A wrapper exclusively owns one raw handle and releases it on drop
//! through the typedef's declared release function, checking the success
//! predicate that matches the release return classification. Declared
//! invalid sentinels are treated as already released.

use crate::{
    collision::SymbolKind,
    emit::{CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    handles::{self, ReleaseClassification},
    metadata::token::Token,
    project::{Context, Projector},
    Result,
};

/// Emit the owning wrapper of a releasable handle typedef.
pub(crate) fn emit_safe_handle(token: Token, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    let Some(decl) = ctx.index.type_by_token(token) else {
        return Err(crate::Error::TypeNotFound(token));
    };

    let Some(descriptor) = handles::descriptor_for(ctx.index, decl) else {
        // Namespace handles and typedefs without a release function get no
        // wrapper; the raw typedef stands alone.
        return Ok((None, vec![EmissionKey::Type(token)]));
    };

    if !ctx
        .resolver
        .should_emit(&descriptor.wrapper_name, SymbolKind::SafeHandle)
    {
        return Ok((None, Vec::new()));
    }

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = vec![
        EmissionKey::Type(token),
        EmissionKey::Method(descriptor.release_token),
        EmissionKey::ClassDecl,
    ];

    let handle_ref = ctx
        .resolver
        .reference(&descriptor.handle_name, SymbolKind::Handle);
    let wrapper = &descriptor.wrapper_name;
    let class = &ctx.options.class_name;
    let release = &descriptor.release;

    let payload = match decl.fields.first() {
        Some(field) => projector.project(&field.sig, Context::Field, &mut deps),
        None => "isize".to_string(),
    };
    let zero = if payload.starts_with('*') {
        "::core::ptr::null_mut()".to_string()
    } else {
        "0".to_string()
    };

    // The release import may take a wider handle type (DeleteObject takes
    // HGDIOBJ for every GDI typedef); rewrap the payload when it differs.
    let release_method = ctx
        .index
        .method_by_token(descriptor.release_token)
        .map(|(_, method)| method);
    let release_arg = match release_method.and_then(|method| {
        method
            .sig
            .params
            .first()
            .and_then(|sig| sig.as_named())
            .map(|name| name.name.clone())
    }) {
        Some(param_type) if param_type != descriptor.handle_name => {
            let param_ref = ctx.resolver.reference(&param_type, SymbolKind::Handle);
            if let Some(param_decl) = ctx.index.find_type_anywhere(&param_type) {
                deps.push(EmissionKey::Type(param_decl.token));
            }
            format!("{param_ref}(self.handle.0)")
        }
        _ => "self.handle".to_string(),
    };

    let call = format!("unsafe {{ {class}::{release}({release_arg}) }}");

    let mut sentinels: Vec<i64> = vec![0];
    for value in &descriptor.invalid_values {
        if !sentinels.contains(value) {
            sentinels.push(*value);
        }
    }
    let sentinel_check = sentinels
        .iter()
        .map(|value| format!("self.handle.0 as i64 == {value}"))
        .collect::<Vec<_>>()
        .join(" || ");

    let mut w = CodeWriter::new();
    w.line(&format!(
        "/// Owns a [`{handle}`] and releases it through `{release}` when dropped.",
        handle = descriptor.handle_name,
    ));
    w.open(&format!("pub struct {wrapper} {{"));
    w.line(&format!("handle: {handle_ref},"));
    w.close("}");
    w.blank();

    w.open(&format!("impl {wrapper} {{"));
    w.line("/// Takes ownership of `handle`.");
    w.open(&format!("pub fn new(handle: {handle_ref}) -> Self {{"));
    w.line("Self { handle }");
    w.close("}");
    w.blank();

    w.line("/// The raw handle value.");
    w.open(&format!("pub fn handle(&self) -> {handle_ref} {{"));
    w.line("self.handle");
    w.close("}");
    w.blank();

    w.line("/// Releases ownership without closing the handle.");
    w.open(&format!("pub fn into_raw(self) -> {handle_ref} {{"));
    w.line("let handle = self.handle;");
    w.line("::core::mem::forget(self);");
    w.line("handle");
    w.close("}");
    w.blank();

    w.line("/// Closes the handle now, reporting whether the release call");
    w.line("/// succeeded. Sentinel values count as already released.");
    w.open("pub fn release(&mut self) -> bool {");
    w.open(&format!("if {sentinel_check} {{"));
    w.line("return true;");
    w.close("}");

    let ok_expr = match (
        descriptor.classification,
        descriptor.release_returns_newtype,
    ) {
        (ReleaseClassification::Bool, true) => Some(format!("{call}.0 != 0")),
        (ReleaseClassification::Bool, false) => Some(call.clone()),
        (ReleaseClassification::LStatus, _) => Some(format!("{call}.0 == 0")),
        (ReleaseClassification::NtStatus, _) => Some(format!("{call}.0 >= 0")),
        (ReleaseClassification::HResult, _) => Some(format!("{call}.0 >= 0")),
        (ReleaseClassification::Void, _) | (ReleaseClassification::Other, _) => None,
    };

    match ok_expr {
        Some(expr) => w.line(&format!("let ok = {expr};")),
        None => {
            w.line(&format!("{call};"));
            w.line("let ok = true;");
        }
    }
    w.line(&format!("self.handle = {handle_ref}({zero});"));
    w.line("ok");
    w.close("}");
    w.close("}");
    w.blank();

    w.open(&format!("impl Drop for {wrapper} {{"));
    w.open("fn drop(&mut self) {");
    w.line("self.release();");
    w.close("}");
    w.close("}");

    let fragment = Fragment {
        key: EmissionKey::SafeHandle(token),
        path: format!("{wrapper}.rs"),
        symbol: descriptor.wrapper_name.clone(),
        kind: SymbolKind::SafeHandle,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}
