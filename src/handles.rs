//! Handle release policy.
//!
//! Decides whether a handle typedef gets an owning safe-handle wrapper and
//! what its release call must check. The policy reads the typedef's
//! `RAIIFree` attribute, resolves the named release function, and
//! classifies that function's return type into a success predicate.

use crate::metadata::{
    index::MetadataIndex,
    model::{TypeDecl, TypeKind},
    signatures::TypeSig,
    token::Token,
};

/// How a release function reports success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseClassification {
    /// `BOOL` style: nonzero means success
    Bool,
    /// `LSTATUS` style: zero means success
    LStatus,
    /// `NTSTATUS` style: non-negative means success
    NtStatus,
    /// `HRESULT` style: non-negative means success
    HResult,
    /// No return value; the release always counts as successful
    Void,
    /// Unclassifiable return; the release result is not judged
    Other,
}

/// Everything the safe-handle emitter needs about one handle typedef.
#[derive(Clone, Debug)]
pub struct SafeHandleDescriptor {
    /// Token of the handle typedef
    pub handle_token: Token,
    /// Short name of the handle typedef
    pub handle_name: String,
    /// Name of the wrapper type, `<ReleaseFn>SafeHandle`
    pub wrapper_name: String,
    /// Name of the release function
    pub release: String,
    /// Token of the release method
    pub release_token: Token,
    /// Success discipline of the release return value
    pub classification: ReleaseClassification,
    /// True when the release return is a typedef newtype (needs `.0`)
    pub release_returns_newtype: bool,
    /// Raw values that denote "no handle" for this typedef
    pub invalid_values: Vec<i64>,
}

/// Derive the safe-handle descriptor for a handle typedef, if one applies.
///
/// No descriptor exists when the typedef is not a handle, names a kernel
/// namespace rather than a releasable resource, carries no `RAIIFree`
/// attribute, or its release function is absent from the metadata. A
/// release function taking anything beyond the handle itself cannot be
/// invoked from a drop hook and yields no descriptor either.
#[must_use]
pub fn descriptor_for(index: &MetadataIndex, decl: &TypeDecl) -> Option<SafeHandleDescriptor> {
    if decl.kind != TypeKind::HandleTypedef || decl.is_namespace_handle() {
        return None;
    }

    let release = decl.raii_free()?;
    let method = index.find_method_anywhere(release)?;
    if method.sig.params.len() != 1 {
        return None;
    }
    let (classification, release_returns_newtype) = classify(&method.sig.return_type);

    Some(SafeHandleDescriptor {
        handle_token: decl.token,
        handle_name: decl.name.clone(),
        wrapper_name: format!("{release}SafeHandle"),
        release: release.to_string(),
        release_token: method.token,
        classification,
        release_returns_newtype,
        invalid_values: decl.invalid_handle_values(),
    })
}

fn classify(return_type: &TypeSig) -> (ReleaseClassification, bool) {
    match return_type {
        TypeSig::Void => (ReleaseClassification::Void, false),
        TypeSig::Bool => (ReleaseClassification::Bool, false),
        TypeSig::Named(name) => match name.name.as_str() {
            "BOOL" => (ReleaseClassification::Bool, true),
            "LSTATUS" | "WIN32_ERROR" => (ReleaseClassification::LStatus, true),
            "NTSTATUS" => (ReleaseClassification::NtStatus, true),
            "HRESULT" => (ReleaseClassification::HResult, true),
            _ => (ReleaseClassification::Other, true),
        },
        _ => (ReleaseClassification::Other, false),
    }
}
