//! COM interface emission.
//!
//! An interface becomes a function-pointer-table pair: a `#[repr(C)]`
//! struct holding the vtable pointer and a `_Vtbl` struct whose slots are
//! the inherited slots of every base (recursively, in declaration order)
//! followed by the interface's own. Call sites go through raw pointers;
//! friendly renditions of qualifying methods are inherent methods that
//! dispatch through the vtable.

use crate::{
    collision::SymbolKind,
    emit::{
        escape_ident,
        methods::{analyze, render_friendly_fn, write_method_docs},
        CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment,
    },
    metadata::{
        model::{MethodDecl, TypeDecl},
        signatures::TypeSig,
    },
    project::{Context, Projector},
    Result,
};

/// Collect the base chain of an interface, base-most first.
fn base_chain<'a>(decl: &'a TypeDecl, ctx: &EmitCtx<'a>, chain: &mut Vec<&'a TypeDecl>) {
    for base in &decl.interfaces {
        let resolved = if base.namespace.is_empty() {
            ctx.index.find_type_anywhere(&base.name)
        } else {
            ctx.index.find_type(&base.namespace, &base.name)
        };

        match resolved {
            Some(base_decl) => {
                base_chain(base_decl, ctx, chain);
                chain.push(base_decl);
            }
            None => {
                log::warn!(
                    "interface {} inherits {} which is outside the metadata; its slots are absent",
                    decl.name,
                    base
                );
            }
        }
    }
}

fn slot_signature(
    method: &MethodDecl,
    projector: &Projector<'_>,
    deps: &mut Vec<EmissionKey>,
) -> String {
    let mut params = vec!["this: *mut ::core::ffi::c_void".to_string()];
    for (idx, sig) in method.sig.params.iter().enumerate() {
        let name = escape_ident(&method.param_name(idx as u16 + 1));
        let rust = projector.project(sig, Context::Param, deps);
        params.push(format!("{name}: {rust}"));
    }

    let ret = match &method.sig.return_type {
        TypeSig::Void => String::new(),
        sig => format!(
            " -> {}",
            projector.project(sig, Context::Return, deps)
        ),
    };

    format!(
        "unsafe extern \"system\" fn({params}){ret}",
        params = params.join(", ")
    )
}

/// Emit a COM interface.
pub(crate) fn emit_interface(decl: &TypeDecl, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    if !ctx.resolver.should_emit(&decl.name, SymbolKind::Interface) {
        return Ok((None, Vec::new()));
    }

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = Vec::new();

    let mut bases = Vec::new();
    base_chain(decl, ctx, &mut bases);
    for base in &bases {
        deps.push(EmissionKey::Type(base.token));
    }

    let name = &decl.name;
    let vtbl = format!("{name}_Vtbl");

    let mut w = CodeWriter::new();
    for attr in &decl.attrs {
        if let crate::metadata::attributes::AttrDecl::Documentation { url } = attr {
            w.line(&format!("/// [Learn more]({url})"));
        }
    }
    w.line("#[repr(C)]");
    w.line("#[derive(Clone, Copy)]");
    w.line("#[allow(non_camel_case_types)]");
    w.open(&format!("pub struct {name} {{"));
    w.line(&format!("pub vtable: *const {vtbl},"));
    w.close("}");
    w.blank();

    w.line("#[repr(C)]");
    w.line("#[allow(non_snake_case, non_camel_case_types)]");
    w.open(&format!("pub struct {vtbl} {{"));
    for base in &bases {
        for method in &base.methods {
            w.line(&format!(
                "pub {slot}: {signature},",
                slot = escape_ident(&method.name),
                signature = slot_signature(method, &projector, &mut deps)
            ));
        }
    }
    for method in &decl.methods {
        w.line(&format!(
            "pub {slot}: {signature},",
            slot = escape_ident(&method.name),
            signature = slot_signature(method, &projector, &mut deps)
        ));
    }
    w.close("}");

    // The inherent impl: identity plus friendly renditions of qualifying
    // methods.
    let friendly: Vec<&MethodDecl> = decl
        .methods
        .iter()
        .filter(|method| analyze(method, ctx.index).qualifies())
        .collect();

    if decl.guid.is_some() || !friendly.is_empty() {
        w.blank();
        w.line("#[allow(non_snake_case)]");
        w.open(&format!("impl {name} {{"));

        if let Some(guid) = decl.guid {
            deps.push(EmissionKey::GuidType);
            let guid_ref = ctx.resolver.reference("GUID", SymbolKind::Struct);
            w.line("/// The interface identifier.");
            w.line(&format!(
                "pub const IID: {guid_ref} = {expr};",
                expr = super::constants::guid_expression(&guid_ref, &guid)
            ));
        }

        for method in friendly {
            w.blank();
            write_method_docs(&mut w, method);
            let plan = analyze(method, ctx.index);
            let call_target = format!(
                "((*self.vtable).{slot})",
                slot = escape_ident(&method.name)
            );
            render_friendly_fn(
                &mut w,
                method,
                &plan,
                &escape_ident(&method.name),
                Some("&self"),
                &call_target,
                ctx,
                &mut deps,
            )?;
        }

        w.close("}");
    }

    let fragment = Fragment {
        key: EmissionKey::Type(decl.token),
        path: format!("{name}.rs"),
        symbol: decl.name.clone(),
        kind: SymbolKind::Interface,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}
