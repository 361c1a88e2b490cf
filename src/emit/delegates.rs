//! Delegate emission.
//!
//! A delegate becomes an `Option` wrapped function pointer alias, which
//! keeps null callbacks representable with the same ABI as the raw
//! pointer.

use crate::{
    collision::SymbolKind,
    emit::{escape_ident, CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    metadata::{model::TypeDecl, signatures::TypeSig},
    project::{Context, Projector},
    Result,
};

/// Emit a delegate as a function pointer alias.
pub(crate) fn emit_delegate(decl: &TypeDecl, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    if !ctx.resolver.should_emit(&decl.name, SymbolKind::Delegate) {
        return Ok((None, Vec::new()));
    }

    let Some(invoke) = decl.methods.iter().find(|method| method.name == "Invoke") else {
        return Err(malformed_error!(
            "Delegate '{}' has no Invoke method",
            decl.name
        ));
    };

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = Vec::new();

    let mut params = Vec::new();
    for (idx, sig) in invoke.sig.params.iter().enumerate() {
        let name = escape_ident(&invoke.param_name(idx as u16 + 1));
        let rust = projector.project(sig, Context::Param, &mut deps);
        params.push(format!("{name}: {rust}"));
    }

    let ret = match &invoke.sig.return_type {
        TypeSig::Void => String::new(),
        sig => format!(
            " -> {}",
            projector.project(sig, Context::Return, &mut deps)
        ),
    };

    let mut w = CodeWriter::new();
    w.line("#[allow(non_camel_case_types)]");
    w.line(&format!(
        "pub type {name} = Option<unsafe extern \"system\" fn({params}){ret}>;",
        name = decl.name,
        params = params.join(", ")
    ));

    let fragment = Fragment {
        key: EmissionKey::Type(decl.token),
        path: format!("{}.rs", decl.name),
        symbol: decl.name.clone(),
        kind: SymbolKind::Delegate,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}
