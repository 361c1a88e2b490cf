//! Extern method emission, raw and friendly renditions.
//!
//! The raw rendition keeps the native name and the ABI exact signature,
//! declared through a local `#[link]` extern block inside an `impl` of the
//! configurable container struct. The friendly rendition is a snake_case
//! sibling that substitutes safe handles, `bool`, slices and delegate
//! references where the signature qualifies. Both renditions are distinct
//! emission keys and coexist.

use crate::{
    collision::SymbolKind,
    emit::{escape_ident, friendly_name, CodeWriter, EmissionKey, EmitCtx, EmitOutcome, Fragment},
    handles,
    metadata::{
        index::MetadataIndex,
        model::{MethodDecl, TypeKind},
        signatures::TypeSig,
        token::Token,
    },
    project::{Context, Projector},
    Result,
};

/// How one parameter travels through the friendly rendition.
pub(crate) enum ParamPlan {
    /// Unchanged from the raw signature
    Passthrough,
    /// `BOOL` input becomes `bool`
    Bool,
    /// `*mut BOOL` output becomes `&mut bool`, bridged through a temporary
    OutBool,
    /// Releasable handle input becomes a wrapper reference
    SafeHandle {
        /// Wrapper type name
        wrapper: String,
    },
    /// Size-indexed array becomes a slice; the length parameter is derived
    Slice {
        /// Sequence of the length parameter this slice absorbs
        len_seq: u16,
        /// True for output buffers
        mutable: bool,
    },
    /// Length parameter absorbed by a slice; not part of the friendly
    /// signature
    LenOf {
        /// Sequence of the slice parameter
        source_seq: u16,
    },
    /// `*mut` delegate output becomes a plain mutable reference
    OutDelegate {
        /// Delegate alias name
        alias: String,
    },
}

/// How the return value travels through the friendly rendition.
pub(crate) enum ReturnPlan {
    /// Unchanged
    Passthrough,
    /// `BOOL` becomes `bool`
    Bool,
    /// Releasable handle becomes an owning wrapper
    SafeHandle {
        /// Wrapper type name
        wrapper: String,
    },
}

/// The friendly analysis of one method signature.
pub(crate) struct FriendlyPlan {
    pub params: Vec<ParamPlan>,
    pub ret: ReturnPlan,
}

impl FriendlyPlan {
    /// True when any substitution applies, i.e. a friendly rendition is
    /// worth emitting at all.
    pub fn qualifies(&self) -> bool {
        !matches!(self.ret, ReturnPlan::Passthrough)
            || self
                .params
                .iter()
                .any(|plan| !matches!(plan, ParamPlan::Passthrough))
    }
}

fn named_decl_kind<'a>(
    index: &'a MetadataIndex,
    sig: &TypeSig,
) -> Option<(&'a crate::metadata::model::TypeDecl, TypeKind)> {
    let name = sig.as_named()?;
    let decl = if name.namespace.is_empty() {
        index.find_type_anywhere(&name.name)
    } else {
        index.find_type(&name.namespace, &name.name)
    }?;
    Some((decl, decl.kind))
}

/// Analyze a method for its friendly rendition.
pub(crate) fn analyze(method: &MethodDecl, index: &MetadataIndex) -> FriendlyPlan {
    let mut params: Vec<ParamPlan> = Vec::with_capacity(method.sig.params.len());

    for (idx, sig) in method.sig.params.iter().enumerate() {
        let seq = idx as u16 + 1;
        let param = method.param(seq);
        let is_out = param.map(|p| p.is_out()).unwrap_or(false);

        // Size-indexed arrays become slices and absorb their length.
        if let Some((Some(count_idx), _)) = param.and_then(|p| p.array_info()) {
            if matches!(sig, TypeSig::Ptr(_) | TypeSig::SzArray(_)) {
                params.push(ParamPlan::Slice {
                    len_seq: count_idx + 1,
                    mutable: is_out,
                });
                continue;
            }
        }

        match sig {
            TypeSig::Named(name) if name.name == "BOOL" => params.push(ParamPlan::Bool),
            TypeSig::Named(_) => {
                if let Some((decl, TypeKind::HandleTypedef)) = named_decl_kind(index, sig) {
                    if let Some(descriptor) = handles::descriptor_for(index, decl) {
                        params.push(ParamPlan::SafeHandle {
                            wrapper: descriptor.wrapper_name,
                        });
                        continue;
                    }
                }
                params.push(ParamPlan::Passthrough);
            }
            TypeSig::Ptr(inner) | TypeSig::ByRef(inner) if is_out => match inner.as_ref() {
                TypeSig::Named(name) if name.name == "BOOL" => params.push(ParamPlan::OutBool),
                inner_sig => {
                    if let Some((decl, TypeKind::Delegate)) = named_decl_kind(index, inner_sig) {
                        params.push(ParamPlan::OutDelegate {
                            alias: decl.name.clone(),
                        });
                    } else {
                        params.push(ParamPlan::Passthrough);
                    }
                }
            },
            _ => params.push(ParamPlan::Passthrough),
        }
    }

    // Length parameters absorbed by slices drop out of the signature.
    let slice_pairs: Vec<(u16, u16)> = params
        .iter()
        .enumerate()
        .filter_map(|(idx, plan)| match plan {
            ParamPlan::Slice { len_seq, .. } => Some((*len_seq, idx as u16 + 1)),
            _ => None,
        })
        .collect();
    for (len_seq, source_seq) in slice_pairs {
        let len_idx = len_seq as usize - 1;
        if let Some(slot) = params.get_mut(len_idx) {
            *slot = ParamPlan::LenOf { source_seq };
        }
    }

    let ret = match &method.sig.return_type {
        TypeSig::Named(name) if name.name == "BOOL" => ReturnPlan::Bool,
        sig @ TypeSig::Named(_) => {
            if let Some((decl, TypeKind::HandleTypedef)) = named_decl_kind(index, sig) {
                if let Some(descriptor) = handles::descriptor_for(index, decl) {
                    ReturnPlan::SafeHandle {
                        wrapper: descriptor.wrapper_name,
                    }
                } else {
                    ReturnPlan::Passthrough
                }
            } else {
                ReturnPlan::Passthrough
            }
        }
        _ => ReturnPlan::Passthrough,
    };

    FriendlyPlan { params, ret }
}

/// Emit the raw rendition of an extern method.
pub(crate) fn emit_extern(token: Token, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    let Some((_, method)) = ctx.index.method_by_token(token) else {
        return Err(crate::Error::TypeNotFound(token));
    };
    let Some(pinvoke) = method.pinvoke.as_ref() else {
        return Err(crate::Error::NotSupported(format!(
            "method '{}' has no native import",
            method.name
        )));
    };

    if !ctx.resolver.should_emit(&method.name, SymbolKind::Function) {
        return Ok((None, Vec::new()));
    }

    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };
    let mut deps = vec![EmissionKey::ClassDecl];

    let mut signature = Vec::new();
    for (idx, sig) in method.sig.params.iter().enumerate() {
        let name = escape_ident(&method.param_name(idx as u16 + 1));
        let rust = projector.project(sig, Context::Param, &mut deps);
        signature.push(format!("{name}: {rust}"));
    }

    let ret = match &method.sig.return_type {
        TypeSig::Void => String::new(),
        sig => format!(
            " -> {}",
            projector.project(sig, Context::Return, &mut deps)
        ),
    };

    let params_text = signature.join(", ");
    let args_text = (1..=method.sig.params.len() as u16)
        .map(|seq| escape_ident(&method.param_name(seq)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut w = CodeWriter::new();
    w.line("#[allow(non_snake_case)]");
    w.open(&format!(
        "impl {class} {{",
        class = ctx.options.class_name
    ));
    write_method_docs(&mut w, method);
    if pinvoke.sets_last_error() {
        w.line("/// Sets the thread's last-error code; retrieve it with");
        w.line("/// `std::io::Error::last_os_error()`.");
    }
    w.open(&format!(
        "pub unsafe fn {name}({params_text}){ret} {{",
        name = escape_ident(&method.name)
    ));
    w.line(&format!(
        "#[link(name = \"{module}\")]",
        module = pinvoke.module_stem()
    ));
    w.open(&format!("extern \"{abi}\" {{", abi = pinvoke.abi()));
    if pinvoke.entry_point != method.name {
        w.line(&format!(
            "#[link_name = \"{entry}\"]",
            entry = pinvoke.entry_point
        ));
    }
    w.line(&format!(
        "fn {name}({params_text}){ret};",
        name = escape_ident(&method.name)
    ));
    w.close("}");
    w.line(&format!(
        "{name}({args_text})",
        name = escape_ident(&method.name)
    ));
    w.close("}");
    w.close("}");

    let plan = analyze(method, ctx.index);
    if plan.qualifies() {
        deps.push(EmissionKey::FriendlyMethod(token));
    }

    let fragment = Fragment {
        key: EmissionKey::Method(token),
        path: format!("{}.rs", ctx.options.class_name),
        symbol: method.name.clone(),
        kind: SymbolKind::Function,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}

/// Emit the friendly rendition of an extern method.
pub(crate) fn emit_friendly(token: Token, ctx: &EmitCtx<'_>) -> Result<EmitOutcome> {
    let Some((_, method)) = ctx.index.method_by_token(token) else {
        return Err(crate::Error::TypeNotFound(token));
    };

    let fname = friendly_name(&method.name);
    if !ctx.resolver.should_emit(&fname, SymbolKind::Function) {
        return Ok((None, Vec::new()));
    }

    let plan = analyze(method, ctx.index);
    if !plan.qualifies() {
        return Ok((None, Vec::new()));
    }

    let mut deps = vec![EmissionKey::Method(token), EmissionKey::ClassDecl];
    let mut w = CodeWriter::new();

    w.line("#[allow(non_snake_case)]");
    w.open(&format!(
        "impl {class} {{",
        class = ctx.options.class_name
    ));
    w.line(&format!(
        "/// Idiomatic rendition of `{raw}`; substitutes safe handles,",
        raw = method.name
    ));
    w.line("/// booleans and slices at the call boundary.");

    let call_target = format!("Self::{}", escape_ident(&method.name));
    render_friendly_fn(
        &mut w,
        method,
        &plan,
        &fname,
        None,
        &call_target,
        ctx,
        &mut deps,
    )?;

    w.close("}");

    let fragment = Fragment {
        key: EmissionKey::FriendlyMethod(token),
        path: format!("{}.rs", ctx.options.class_name),
        symbol: fname,
        kind: SymbolKind::Function,
        source: w.finish(),
    };

    Ok((Some(fragment), deps))
}

/// Write the shared doc lines of a method (documentation link, platform).
pub(crate) fn write_method_docs(w: &mut CodeWriter, method: &MethodDecl) {
    if let Some(url) = method.documentation() {
        w.line(&format!("/// [Learn more]({url})"));
    }
    if let Some(platform) = method.supported_platform() {
        w.line(&format!("/// Requires {platform} or later."));
    }
}

/// Render a friendly function body against an arbitrary call target.
///
/// Shared between P/Invoke friendly overloads (`Self::Name`) and COM
/// interface friendly methods (a vtable slot invocation); `self_param`
/// carries the receiver and hidden first argument for the latter.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_friendly_fn(
    w: &mut CodeWriter,
    method: &MethodDecl,
    plan: &FriendlyPlan,
    fn_name: &str,
    self_param: Option<&str>,
    call_target: &str,
    ctx: &EmitCtx<'_>,
    deps: &mut Vec<EmissionKey>,
) -> Result<()> {
    let projector = Projector {
        index: ctx.index,
        resolver: ctx.resolver,
    };

    let bool_ref = ctx.resolver.reference("BOOL", SymbolKind::Handle);
    let mut signature = Vec::new();
    if let Some(receiver) = self_param {
        signature.push(receiver.to_string());
    }

    let mut temps: Vec<String> = Vec::new();
    let mut writebacks: Vec<String> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    let mut hidden_args: Vec<String> = Vec::new();
    if self_param.is_some() {
        hidden_args.push("self as *const Self as *mut ::core::ffi::c_void".to_string());
    }

    for (idx, sig) in method.sig.params.iter().enumerate() {
        let seq = idx as u16 + 1;
        let name = escape_ident(&method.param_name(seq));

        match &plan.params[idx] {
            ParamPlan::Passthrough => {
                let rust = projector.project(sig, Context::Param, deps);
                signature.push(format!("{name}: {rust}"));
                args.push(name);
            }
            ParamPlan::Bool => {
                if let Some(decl) = ctx.index.find_type_anywhere("BOOL") {
                    deps.push(EmissionKey::Type(decl.token));
                }
                signature.push(format!("{name}: bool"));
                args.push(format!("{bool_ref}({name} as i32)"));
            }
            ParamPlan::OutBool => {
                if let Some(decl) = ctx.index.find_type_anywhere("BOOL") {
                    deps.push(EmissionKey::Type(decl.token));
                }
                signature.push(format!("{name}: &mut bool"));
                temps.push(format!("let mut {name}__ = {bool_ref}(0);"));
                writebacks.push(format!("*{name} = {name}__.0 != 0;"));
                args.push(format!("&mut {name}__"));
            }
            ParamPlan::SafeHandle { wrapper } => {
                let wrapper_ref = ctx.resolver.reference(wrapper, SymbolKind::SafeHandle);
                // The wrapper fragment pulls in the handle type itself.
                if let Some(handle) = sig
                    .as_named()
                    .and_then(|n| ctx.index.find_type_anywhere(&n.name))
                {
                    deps.push(EmissionKey::SafeHandle(handle.token));
                }
                signature.push(format!("{name}: &{wrapper_ref}"));
                args.push(format!("{name}.handle()"));
            }
            ParamPlan::Slice {
                len_seq, mutable, ..
            } => {
                let element = match sig {
                    TypeSig::Ptr(inner) | TypeSig::SzArray(inner) => {
                        projector.project(inner, Context::Field, deps)
                    }
                    other => projector.project(other, Context::Field, deps),
                };

                if *mutable {
                    signature.push(format!("{name}: &mut [{element}]"));
                    args.push(format!("{name}.as_mut_ptr()"));
                } else {
                    signature.push(format!("{name}: &[{element}]"));
                    args.push(format!("{name}.as_ptr() as *mut _"));
                }

                let _ = len_seq;
            }
            ParamPlan::LenOf { source_seq } => {
                let source = escape_ident(&method.param_name(*source_seq));
                let len_type = projector.project(sig, Context::Param, deps);
                args.push(format!("{source}.len() as {len_type}"));
            }
            ParamPlan::OutDelegate { alias } => {
                let alias_ref = ctx.resolver.reference(alias, SymbolKind::Delegate);
                if let Some(decl) = ctx.index.find_type_anywhere(alias) {
                    deps.push(EmissionKey::Type(decl.token));
                }
                signature.push(format!("{name}: &mut {alias_ref}"));
                args.push(name);
            }
        }
    }

    let ret_text = match (&plan.ret, &method.sig.return_type) {
        (_, TypeSig::Void) => String::new(),
        (ReturnPlan::Bool, _) => " -> bool".to_string(),
        (ReturnPlan::SafeHandle { wrapper }, sig) => {
            if let Some(handle) = sig
                .as_named()
                .and_then(|name| ctx.index.find_type_anywhere(&name.name))
            {
                deps.push(EmissionKey::SafeHandle(handle.token));
            }
            format!(
                " -> {}",
                ctx.resolver.reference(wrapper, SymbolKind::SafeHandle)
            )
        }
        (ReturnPlan::Passthrough, sig) => format!(
            " -> {}",
            projector.project(sig, Context::Return, deps)
        ),
    };

    w.open(&format!(
        "pub unsafe fn {fn_name}({params}){ret_text} {{",
        params = signature.join(", ")
    ));

    for temp in &temps {
        w.line(temp);
    }

    let mut all_args = hidden_args;
    all_args.extend(args);
    let call = format!("{call_target}({})", all_args.join(", "));

    let returns_value = !matches!(method.sig.return_type, TypeSig::Void);
    if returns_value {
        if writebacks.is_empty() {
            match &plan.ret {
                ReturnPlan::Passthrough => w.line(&call),
                ReturnPlan::Bool => w.line(&format!("{call}.0 != 0")),
                ReturnPlan::SafeHandle { wrapper } => {
                    let wrapper_ref = ctx.resolver.reference(wrapper, SymbolKind::SafeHandle);
                    w.line(&format!("{wrapper_ref}::new({call})"));
                }
            }
        } else {
            w.line(&format!("let result__ = {call};"));
            for writeback in &writebacks {
                w.line(writeback);
            }
            match &plan.ret {
                ReturnPlan::Passthrough => w.line("result__"),
                ReturnPlan::Bool => w.line("result__.0 != 0"),
                ReturnPlan::SafeHandle { wrapper } => {
                    let wrapper_ref = ctx.resolver.reference(wrapper, SymbolKind::SafeHandle);
                    w.line(&format!("{wrapper_ref}::new(result__)"));
                }
            }
        }
    } else {
        w.line(&format!("{call};"));
        for writeback in &writebacks {
            w.line(writeback);
        }
    }

    w.close("}");
    Ok(())
}
