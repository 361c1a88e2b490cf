//! End to end generation scenarios over the fixture metadata.

mod common;

use common::fixture;
use wingen::{
    CancellationToken, CompilationView, Error, Generator, GeneratorOptions, SymbolKind,
};

fn generator() -> Generator {
    Generator::new(fixture(), GeneratorOptions::default(), CompilationView::new())
}

fn all_text(generator: &Generator) -> String {
    generator
        .files()
        .iter()
        .map(|file| format!("// ==> {}\n{}", file.path, file.contents))
        .collect::<Vec<_>>()
        .join("\n")
}

fn assert_has(text: &str, needle: &str) {
    assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
}

fn assert_lacks(text: &str, needle: &str) {
    assert!(text.contains(needle) == false, "unexpected `{needle}` in:\n{text}");
}

#[test]
fn get_tick_count_emits_one_extern() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("GetTickCount", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub struct PInvoke;");
    assert_has(&text, "pub unsafe fn GetTickCount() -> u32");
    assert_has(&text, "#[link(name = \"kernel32\")]");
    assert!(generator
        .files()
        .iter()
        .any(|file| file.path == "PInvoke.rs"));
}

#[test]
fn create_file_pairs_raw_and_friendly() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("CreateFile", &token).unwrap());

    let text = all_text(&generator);

    // Raw rendition, ABI exact.
    assert_has(
        &text,
        "pub unsafe fn CreateFile(lpFileName: PCWSTR, dwDesiredAccess: u32, dwShareMode: u32, dwCreationDisposition: FILE_CREATE_FLAGS, hTemplateFile: HANDLE) -> HANDLE",
    );

    // Friendly rendition: safe handle in, safe handle out.
    assert_has(&text, "pub unsafe fn create_file(");
    assert_has(&text, "hTemplateFile: &CloseHandleSafeHandle) -> CloseHandleSafeHandle");
    assert_has(&text, "CloseHandleSafeHandle::new(Self::CreateFile(");
    assert_has(&text, "hTemplateFile.handle()");

    // The wrapper and its release predicate.
    assert_has(&text, "pub struct CloseHandleSafeHandle");
    assert_has(&text, "PInvoke::CloseHandle(self.handle) }.0 != 0");

    // Referenced types ride along, including the enum with its adopted
    // member.
    assert_has(&text, "pub struct FILE_CREATE_FLAGS(pub u32);");
    assert_has(
        &text,
        "pub const TRUNCATE_EXISTING: FILE_CREATE_FLAGS = FILE_CREATE_FLAGS(5u32);",
    );
}

#[test]
fn module_glob_skips_get_last_error() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate_module("kernel32.*", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub unsafe fn CreateFile(");
    assert_has(&text, "pub unsafe fn GetTickCount()");
    assert_lacks(&text, "GetLastError");
}

#[test]
fn direct_get_last_error_is_refused() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(matches!(
        generator.generate("GetLastError", &token),
        Err(Error::NotSupported(_))
    ));
    assert!(matches!(
        generator.generate("Windows.Win32.System.Diagnostics.Debug.GetLastError", &token),
        Err(Error::NotSupported(_))
    ));

    // The session stays usable.
    assert!(generator.generate("GetTickCount", &token).unwrap());
}

#[test]
fn handle_request_pulls_release_transitively() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("HANDLE", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub struct HANDLE(pub isize);");
    assert_has(&text, "pub const INVALID: Self = Self(-1 as isize);");
    assert_has(&text, "pub struct CloseHandleSafeHandle");
    assert_has(&text, "fn CloseHandle(hObject: HANDLE) -> BOOL");
}

#[test]
fn namespace_handles_get_no_wrapper() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("CreatePrivateNamespace", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub unsafe fn CreatePrivateNamespace(");
    assert_has(&text, "pub struct NamespaceHandle(pub isize);");
    assert_lacks(&text, "ClosePrivateNamespaceSafeHandle");
}

#[test]
fn user_declared_enum_wins() {
    let mut view = CompilationView::new();
    view.declare("FILE_CREATE_FLAGS", SymbolKind::Enum);

    let mut generator = Generator::new(fixture(), GeneratorOptions::default(), view);
    let token = CancellationToken::new();

    assert!(generator.generate("CreateFile", &token).unwrap());

    let text = all_text(&generator);
    assert_lacks(&text, "pub struct FILE_CREATE_FLAGS");
    // References rebind to the user's declaration by short name.
    assert_has(&text, "dwCreationDisposition: FILE_CREATE_FLAGS");
}

#[test]
fn colliding_user_symbol_qualifies_references() {
    let mut view = CompilationView::new();
    view.declare("HANDLE", SymbolKind::Function);

    let mut generator = Generator::new(fixture(), GeneratorOptions::default(), view);
    let token = CancellationToken::new();

    assert!(generator.generate("CloseHandle", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "hObject: crate::Microsoft::Windows::Sdk::HANDLE");
}

#[test]
fn interface_flattens_bases_and_projects_bool_out() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("ISpellCheckerFactory", &token).unwrap());

    let text = all_text(&generator);

    // The vtable carries inherited slots first, then the interface's own.
    assert_has(&text, "pub struct ISpellCheckerFactory_Vtbl");
    assert_has(
        &text,
        "pub QueryInterface: unsafe extern \"system\" fn(this: *mut ::core::ffi::c_void, riid: *mut GUID, ppvObject: *mut *mut ::core::ffi::c_void) -> HRESULT,",
    );
    assert_has(
        &text,
        "pub IsSupported: unsafe extern \"system\" fn(this: *mut ::core::ffi::c_void, languageTag: PCWSTR, value: *mut BOOL) -> HRESULT,",
    );
    let query_interface = text.find("pub QueryInterface:").unwrap();
    let is_supported = text.find("pub IsSupported:").unwrap();
    assert!(query_interface < is_supported);

    // Identity and base interface ride along.
    assert_has(
        &text,
        "pub const IID: GUID = GUID::from_values(0x8e018a9d, 0x2415, 0x4677, [0xbf, 0x6c, 0x19, 0x3d, 0x50, 0xb6, 0xf4, 0x63]);",
    );
    assert_has(&text, "pub struct IUnknown");
    assert_has(&text, "pub struct GUID");

    // The friendly rendition projects the BOOL out-parameter as a native
    // boolean.
    assert_has(
        &text,
        "pub unsafe fn IsSupported(&self, languageTag: PCWSTR, value: &mut bool) -> HRESULT",
    );
    assert_has(&text, "*value = value__.0 != 0;");
}

#[test]
fn struct_fields_keep_bool_verbatim() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("ICONINFO", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "#[repr(C)]");
    assert_has(&text, "pub fIcon: BOOL,");
    assert_lacks(&text, "fIcon: bool");
    assert_has(&text, "pub struct BOOL(pub i32);");
}

#[test]
fn ieee_specials_use_target_literals() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("POSITIVE_INFINITY", &token).unwrap());
    assert!(generator.generate("NEGATIVE_INFINITY", &token).unwrap());
    assert!(generator.generate("NaN", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub const POSITIVE_INFINITY: f32 = f32::INFINITY;");
    assert_has(&text, "pub const NEGATIVE_INFINITY: f32 = f32::NEG_INFINITY;");
    assert_has(&text, "pub const NaN: f32 = f32::NAN;");
}

#[test]
fn two_generators_cooperate_through_visibility() {
    let token = CancellationToken::new();

    // Without cross visibility both emit, under distinct class names.
    let mut first = Generator::new(
        fixture(),
        GeneratorOptions {
            class_name: "P1".to_string(),
            ..GeneratorOptions::default()
        },
        CompilationView::new(),
    );
    let mut second = Generator::new(
        fixture(),
        GeneratorOptions {
            class_name: "P2".to_string(),
            ..GeneratorOptions::default()
        },
        CompilationView::new(),
    );

    assert!(first.generate("GetTickCount", &token).unwrap());
    assert!(second.generate("GetTickCount", &token).unwrap());
    assert_has(&all_text(&first), "impl P1 {");
    assert_has(&all_text(&second), "impl P2 {");

    // With visibility granted the downstream generator binds to the
    // upstream emission instead of re-emitting.
    let mut view = CompilationView::new();
    view.add_upstream("FILE_CREATE_FLAGS", "crate::p1::FILE_CREATE_FLAGS");
    view.set_upstream_visibility(true);

    let mut downstream = Generator::new(fixture(), GeneratorOptions::default(), view);
    assert!(downstream.generate("FILE_CREATE_FLAGS", &token).unwrap());
    assert!(downstream.files().is_empty());

    assert!(downstream.generate("CreateFile", &token).unwrap());
    assert_has(
        &all_text(&downstream),
        "dwCreationDisposition: crate::p1::FILE_CREATE_FLAGS",
    );
}

#[test]
fn repeated_requests_are_idempotent() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("CreateFile", &token).unwrap());
    let first_count = generator.fragment_count();
    let first_text = all_text(&generator);

    assert!(generator.generate("CreateFile", &token).unwrap());
    assert_eq!(generator.fragment_count(), first_count);
    assert_eq!(all_text(&generator), first_text);

    // A second route to the same entities adds nothing either.
    assert!(generator.generate("HANDLE", &token).unwrap());
    let handle_count = generator.fragment_count();
    assert!(generator.generate("CloseHandle", &token).unwrap());
    assert_eq!(generator.fragment_count(), handle_count);
}

#[test]
fn unknown_names_are_soft_misses() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(!generator.generate("DoesNotExist", &token).unwrap());
    assert!(!generator.generate_module("nosuchmodule.*", &token).unwrap());
    assert!(generator.files().is_empty());
}

#[test]
fn cancellation_is_observed_and_partial_output_survives() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("GetTickCount", &token).unwrap());
    let before = generator.fragment_count();

    token.cancel();
    assert!(matches!(
        generator.generate("CreateFile", &token),
        Err(Error::Cancelled)
    ));

    // Accumulated fragments stay readable after cancellation.
    assert_eq!(generator.fragment_count(), before);
    assert_has(&all_text(&generator), "pub unsafe fn GetTickCount()");
}

#[test]
fn generate_all_covers_types_and_methods() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate_all(&token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub struct ICONINFO");
    assert_has(&text, "pub struct HANDLE(pub isize);");
    assert_has(&text, "pub type WNDPROC");
    assert_has(&text, "pub struct ISpellCheckerFactory");
    assert_has(&text, "pub unsafe fn CreateFile(");
    assert_lacks(&text, "GetLastError");
}

#[test]
fn single_file_mode_concatenates() {
    let mut generator = Generator::new(
        fixture(),
        GeneratorOptions {
            emit_single_file: true,
            ..GeneratorOptions::default()
        },
        CompilationView::new(),
    );
    let token = CancellationToken::new();

    assert!(generator.generate("CreateFile", &token).unwrap());

    let files = generator.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "Microsoft.Windows.Sdk.rs");
    assert_has(&files[0].contents, "pub unsafe fn CreateFile(");
    assert_has(&files[0].contents, "pub struct HANDLE(pub isize);");
}

#[test]
fn delegates_become_function_pointer_aliases() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("WNDPROC", &token).unwrap());

    let text = all_text(&generator);
    assert_has(
        &text,
        "pub type WNDPROC = Option<unsafe extern \"system\" fn(hWnd: HWND, msg: u32, wParam: usize, lParam: isize) -> isize>;",
    );
    assert_has(&text, "pub struct HWND(pub isize);");
}

#[test]
fn nested_unions_get_positional_sibling_names() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("INPUT", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub struct INPUT");
    assert_has(&text, "pub r#type: u32,");

    // The anonymous metadata name never reaches the output; the union and
    // every reference to it carry the computed `<Outer>_<index>` name.
    assert_has(&text, "pub Anonymous: INPUT_0,");
    assert_has(&text, "pub union INPUT_0");
    assert_lacks(&text, "_Anonymous_e__Union");
}

#[test]
fn bitfields_get_accessors_over_backing_scalar() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("MENUBARINFO", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub _bitfield: u32,");
    assert_has(&text, "pub fn fBarFocused(&self) -> u32");
    assert_has(&text, "(self._bitfield >> 0) & 0x1");
    assert_has(&text, "pub fn set_fFocused(&mut self, value: u32)");
}

#[test]
fn handle_sentinels_construct_the_typedef() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("HBMMENU_POPUP_RESTORE", &token).unwrap());

    let text = all_text(&generator);
    assert_has(
        &text,
        "pub const HBMMENU_POPUP_RESTORE: HBITMAP = HBITMAP(9isize);",
    );

    // HBITMAP releases through the wider HGDIOBJ typedef.
    assert_has(&text, "pub struct DeleteObjectSafeHandle");
    assert_has(&text, "DeleteObject(HGDIOBJ(self.handle.0))");
}

#[test]
fn size_indexed_arrays_become_slices() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("GetLogicalDriveStringsW", &token).unwrap());

    let text = all_text(&generator);
    assert_has(
        &text,
        "pub unsafe fn GetLogicalDriveStringsW(nBufferLength: u32, lpBuffer: *mut u16) -> u32",
    );
    assert_has(
        &text,
        "pub unsafe fn get_logical_drive_strings_w(lpBuffer: &mut [u16]) -> u32",
    );
    assert_has(
        &text,
        "Self::GetLogicalDriveStringsW(lpBuffer.len() as u32, lpBuffer.as_mut_ptr())",
    );
}

#[test]
fn associated_constants_route_to_their_enum() {
    let mut generator = generator();
    let token = CancellationToken::new();

    assert!(generator.generate("TRUNCATE_EXISTING", &token).unwrap());

    let text = all_text(&generator);
    assert_has(&text, "pub struct FILE_CREATE_FLAGS(pub u32);");
    assert_has(
        &text,
        "pub const TRUNCATE_EXISTING: FILE_CREATE_FLAGS = FILE_CREATE_FLAGS(5u32);",
    );
}
