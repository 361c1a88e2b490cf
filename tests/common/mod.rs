//! In-code metadata fixture for the generation tests.
//!
//! Builds the same owned model the winmd loader produces, shaped after the
//! Foundation / Storage / Gdi / Globalization corners of the Windows
//! metadata that the scenarios exercise. Tokens are handed out
//! sequentially; nothing here touches a binary file.

use wingen::metadata::{
    attributes::{AttrDecl, GuidValue},
    index::MetadataIndex,
    model::{
        ConstantValue, FieldDecl, MethodDecl, ParamDecl, PInvokeInfo, TypeDecl, TypeKind,
        TypeLayout,
    },
    signatures::{MethodSig, TypeName, TypeSig},
    streams::TableId,
    tables::{FieldAttributes, MethodAttributes, ParamAttributes, PInvokeAttributes},
    token::Token,
};

const SUPPORTS_LAST_ERROR: u16 = 0x0040;
const CHAR_SET_UNICODE: u16 = 0x0004;

pub struct Builder {
    types: Vec<TypeDecl>,
    next_type: u32,
    next_method: u32,
    next_field: u32,
}

pub struct Method {
    pub name: &'static str,
    pub params: Vec<(&'static str, TypeSig, ParamAttributes, Vec<AttrDecl>)>,
    pub ret: TypeSig,
    pub module: Option<&'static str>,
    pub last_error: bool,
}

impl Method {
    pub fn extern_fn(name: &'static str, module: &'static str, ret: TypeSig) -> Method {
        Method {
            name,
            params: Vec::new(),
            ret,
            module: Some(module),
            last_error: false,
        }
    }

    pub fn slot(name: &'static str, ret: TypeSig) -> Method {
        Method {
            name,
            params: Vec::new(),
            ret,
            module: None,
            last_error: false,
        }
    }

    pub fn last_error(mut self) -> Method {
        self.last_error = true;
        self
    }

    pub fn param(mut self, name: &'static str, sig: TypeSig) -> Method {
        self.params
            .push((name, sig, ParamAttributes::IN, Vec::new()));
        self
    }

    pub fn out_param(mut self, name: &'static str, sig: TypeSig) -> Method {
        self.params
            .push((name, sig, ParamAttributes::OUT, Vec::new()));
        self
    }

    pub fn attr_param(
        mut self,
        name: &'static str,
        sig: TypeSig,
        flags: ParamAttributes,
        attrs: Vec<AttrDecl>,
    ) -> Method {
        self.params.push((name, sig, flags, attrs));
        self
    }
}

pub fn named(namespace: &str, name: &str) -> TypeSig {
    TypeSig::Named(TypeName::new(namespace, name))
}

pub fn ptr(inner: TypeSig) -> TypeSig {
    TypeSig::Ptr(Box::new(inner))
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            types: Vec::new(),
            next_type: 0,
            next_method: 0,
            next_field: 0,
        }
    }

    fn type_token(&mut self) -> Token {
        self.next_type += 1;
        Token::for_row(TableId::TypeDef, self.next_type)
    }

    fn method_token(&mut self) -> Token {
        self.next_method += 1;
        Token::for_row(TableId::MethodDef, self.next_method)
    }

    fn field_token(&mut self) -> Token {
        self.next_field += 1;
        Token::for_row(TableId::Field, self.next_field)
    }

    fn build_method(&mut self, method: Method, has_this: bool) -> MethodDecl {
        let params = method
            .params
            .iter()
            .enumerate()
            .map(|(idx, (name, _, flags, attrs))| ParamDecl {
                name: (*name).to_string(),
                sequence: idx as u16 + 1,
                flags: *flags,
                attrs: attrs.clone(),
            })
            .collect();

        let pinvoke = method.module.map(|module| {
            let mut bits = CHAR_SET_UNICODE;
            if method.last_error {
                bits |= SUPPORTS_LAST_ERROR;
            }
            PInvokeInfo {
                module: format!("{module}.dll"),
                entry_point: method.name.to_string(),
                flags: PInvokeAttributes::from_bits_retain(bits),
            }
        });

        MethodDecl {
            token: self.method_token(),
            name: method.name.to_string(),
            sig: MethodSig {
                has_this,
                return_type: method.ret,
                params: method.params.into_iter().map(|(_, sig, _, _)| sig).collect(),
            },
            params,
            flags: MethodAttributes::PUBLIC | MethodAttributes::STATIC,
            pinvoke,
            attrs: Vec::new(),
        }
    }

    fn blank_type(&mut self, namespace: &str, name: &str, kind: TypeKind) -> TypeDecl {
        TypeDecl {
            token: self.type_token(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            layout: TypeLayout::Sequential { pack: None },
            base: None,
            fields: Vec::new(),
            methods: Vec::new(),
            interfaces: Vec::new(),
            attrs: Vec::new(),
            enclosing: None,
            nested: Vec::new(),
            guid: None,
        }
    }

    pub fn handle_typedef(
        &mut self,
        namespace: &str,
        name: &str,
        payload: TypeSig,
        mut attrs: Vec<AttrDecl>,
    ) {
        attrs.insert(0, AttrDecl::NativeTypedef);
        let field_token = self.field_token();
        let mut decl = self.blank_type(namespace, name, TypeKind::HandleTypedef);
        decl.base = Some(TypeName::new("System", "ValueType"));
        decl.attrs = attrs;
        decl.fields.push(FieldDecl {
            token: field_token,
            name: "Value".to_string(),
            sig: payload,
            flags: FieldAttributes::PUBLIC,
            constant: None,
            attrs: Vec::new(),
            offset: None,
        });
        self.types.push(decl);
    }

    pub fn structure(
        &mut self,
        namespace: &str,
        name: &str,
        fields: Vec<(&str, TypeSig, Vec<AttrDecl>)>,
    ) {
        let mut decl = self.blank_type(namespace, name, TypeKind::Struct);
        decl.base = Some(TypeName::new("System", "ValueType"));
        for (field_name, sig, attrs) in fields {
            let token = self.field_token();
            decl.fields.push(FieldDecl {
                token,
                name: field_name.to_string(),
                sig,
                flags: FieldAttributes::PUBLIC,
                constant: None,
                attrs,
                offset: None,
            });
        }
        self.types.push(decl);
    }

    /// A struct with one anonymous nested union, the way the loader links
    /// them: the union keeps its compiler generated metadata name and the
    /// outer struct's `Anonymous` field references it by that name. The
    /// positional sibling name is computed at emission time.
    pub fn structure_with_union(
        &mut self,
        namespace: &str,
        name: &str,
        fields: Vec<(&str, TypeSig)>,
        union_fields: Vec<(&str, TypeSig)>,
    ) {
        const ANONYMOUS: &str = "_Anonymous_e__Union";

        let mut outer = self.blank_type(namespace, name, TypeKind::Struct);
        outer.base = Some(TypeName::new("System", "ValueType"));
        for (field_name, sig) in fields {
            let token = self.field_token();
            outer.fields.push(FieldDecl {
                token,
                name: field_name.to_string(),
                sig,
                flags: FieldAttributes::PUBLIC,
                constant: None,
                attrs: Vec::new(),
                offset: None,
            });
        }

        let anonymous_token = self.field_token();
        outer.fields.push(FieldDecl {
            token: anonymous_token,
            name: "Anonymous".to_string(),
            sig: named("", ANONYMOUS),
            flags: FieldAttributes::PUBLIC,
            constant: None,
            attrs: Vec::new(),
            offset: None,
        });

        let mut inner = self.blank_type("", ANONYMOUS, TypeKind::Union);
        inner.base = Some(TypeName::new("System", "ValueType"));
        inner.layout = TypeLayout::Explicit;
        inner.enclosing = Some(outer.token);
        for (field_name, sig) in union_fields {
            let token = self.field_token();
            inner.fields.push(FieldDecl {
                token,
                name: field_name.to_string(),
                sig,
                flags: FieldAttributes::PUBLIC,
                constant: None,
                attrs: Vec::new(),
                offset: Some(0),
            });
        }

        outer.nested.push(inner.token);
        self.types.push(outer);
        self.types.push(inner);
    }

    pub fn enumeration(
        &mut self,
        namespace: &str,
        name: &str,
        underlying: TypeSig,
        members: Vec<(&str, ConstantValue)>,
    ) {
        let mut decl = self.blank_type(namespace, name, TypeKind::Enum);
        decl.base = Some(TypeName::new("System", "Enum"));

        let value_token = self.field_token();
        decl.fields.push(FieldDecl {
            token: value_token,
            name: "value__".to_string(),
            sig: underlying.clone(),
            flags: FieldAttributes::PUBLIC,
            constant: None,
            attrs: Vec::new(),
            offset: None,
        });

        for (member, value) in members {
            let token = self.field_token();
            decl.fields.push(FieldDecl {
                token,
                name: member.to_string(),
                sig: underlying.clone(),
                flags: FieldAttributes::PUBLIC
                    | FieldAttributes::STATIC
                    | FieldAttributes::LITERAL
                    | FieldAttributes::HAS_DEFAULT,
                constant: Some(value),
                attrs: Vec::new(),
                offset: None,
            });
        }

        self.types.push(decl);
    }

    pub fn interface(
        &mut self,
        namespace: &str,
        name: &str,
        bases: Vec<TypeName>,
        guid: GuidValue,
        methods: Vec<Method>,
    ) {
        let built: Vec<MethodDecl> = methods
            .into_iter()
            .map(|method| self.build_method(method, true))
            .collect();

        let mut decl = self.blank_type(namespace, name, TypeKind::Interface);
        decl.interfaces = bases;
        decl.guid = Some(guid);
        decl.attrs = vec![AttrDecl::Guid { value: guid }];
        decl.methods = built;
        self.types.push(decl);
    }

    pub fn delegate(&mut self, namespace: &str, name: &str, invoke: Method) {
        let built = self.build_method(invoke, true);
        let mut decl = self.blank_type(namespace, name, TypeKind::Delegate);
        decl.base = Some(TypeName::new("System", "MulticastDelegate"));
        decl.methods = vec![built];
        self.types.push(decl);
    }

    /// An `Apis` container: extern methods plus constants.
    pub fn apis(
        &mut self,
        namespace: &str,
        methods: Vec<Method>,
        constants: Vec<(&str, TypeSig, Option<ConstantValue>, Vec<AttrDecl>)>,
    ) {
        let built: Vec<MethodDecl> = methods
            .into_iter()
            .map(|method| self.build_method(method, false))
            .collect();

        let mut decl = self.blank_type(namespace, "Apis", TypeKind::Class);
        decl.methods = built;

        for (constant_name, sig, value, attrs) in constants {
            let token = self.field_token();
            decl.fields.push(FieldDecl {
                token,
                name: constant_name.to_string(),
                sig,
                flags: FieldAttributes::PUBLIC
                    | FieldAttributes::STATIC
                    | FieldAttributes::LITERAL
                    | FieldAttributes::HAS_DEFAULT,
                constant: value,
                attrs,
                offset: None,
            });
        }

        self.types.push(decl);
    }

    pub fn build(self) -> MetadataIndex {
        MetadataIndex::from_types(self.types)
    }
}

const IID_IUNKNOWN: GuidValue = GuidValue {
    data1: 0x0000_0000,
    data2: 0x0000,
    data3: 0x0000,
    data4: [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
};

const IID_ISPELLCHECKERFACTORY: GuidValue = GuidValue {
    data1: 0x8E01_8A9D,
    data2: 0x2415,
    data3: 0x4677,
    data4: [0xBF, 0x6C, 0x19, 0x3D, 0x50, 0xB6, 0xF4, 0x63],
};

/// The fixture metadata the scenarios run against.
pub fn fixture() -> MetadataIndex {
    let foundation = "Windows.Win32.Foundation";
    let filesystem = "Windows.Win32.Storage.FileSystem";
    let gdi = "Windows.Win32.Graphics.Gdi";

    let mut b = Builder::new();

    // Foundation typedefs.
    b.handle_typedef(foundation, "BOOL", TypeSig::I4, Vec::new());
    b.handle_typedef(foundation, "HRESULT", TypeSig::I4, Vec::new());
    b.handle_typedef(foundation, "PCWSTR", ptr(TypeSig::U2), Vec::new());
    b.handle_typedef(
        foundation,
        "HANDLE",
        TypeSig::ISize,
        vec![
            AttrDecl::RaiiFree {
                release: "CloseHandle".to_string(),
            },
            AttrDecl::InvalidHandleValue { value: -1 },
        ],
    );
    b.handle_typedef(foundation, "HWND", TypeSig::ISize, Vec::new());

    b.apis(
        foundation,
        vec![Method::extern_fn("CloseHandle", "KERNEL32", named(foundation, "BOOL"))
            .last_error()
            .param("hObject", named(foundation, "HANDLE"))],
        Vec::new(),
    );

    // GDI handles; HBITMAP releases through the wider HGDIOBJ.
    b.handle_typedef(gdi, "HGDIOBJ", TypeSig::ISize, Vec::new());
    b.handle_typedef(
        gdi,
        "HBITMAP",
        TypeSig::ISize,
        vec![
            AttrDecl::RaiiFree {
                release: "DeleteObject".to_string(),
            },
            AttrDecl::AlsoUsableFor {
                other: "HGDIOBJ".to_string(),
            },
        ],
    );
    b.apis(
        gdi,
        vec![Method::extern_fn("DeleteObject", "GDI32", named(foundation, "BOOL"))
            .param("ho", named(gdi, "HGDIOBJ"))],
        Vec::new(),
    );

    // File system: the creation disposition enum and CreateFile.
    b.enumeration(
        filesystem,
        "FILE_CREATE_FLAGS",
        TypeSig::U4,
        vec![
            ("CREATE_NEW", ConstantValue::U4(1)),
            ("CREATE_ALWAYS", ConstantValue::U4(2)),
            ("OPEN_EXISTING", ConstantValue::U4(3)),
        ],
    );
    b.apis(
        filesystem,
        vec![
            Method::extern_fn("CreateFile", "KERNEL32", named(foundation, "HANDLE"))
                .last_error()
                .param("lpFileName", named(foundation, "PCWSTR"))
                .param("dwDesiredAccess", TypeSig::U4)
                .param("dwShareMode", TypeSig::U4)
                .param("dwCreationDisposition", named(filesystem, "FILE_CREATE_FLAGS"))
                .param("hTemplateFile", named(foundation, "HANDLE")),
            Method::extern_fn("GetLogicalDriveStringsW", "KERNEL32", TypeSig::U4)
                .param("nBufferLength", TypeSig::U4)
                .attr_param(
                    "lpBuffer",
                    ptr(TypeSig::U2),
                    ParamAttributes::OUT,
                    vec![AttrDecl::NativeArrayInfo {
                        count_param_index: Some(0),
                        count_const: None,
                    }],
                ),
        ],
        vec![(
            "TRUNCATE_EXISTING",
            TypeSig::U4,
            Some(ConstantValue::U4(5)),
            vec![AttrDecl::AssociatedEnum {
                enum_name: "FILE_CREATE_FLAGS".to_string(),
            }],
        )],
    );

    // System information and last-error surface.
    b.apis(
        "Windows.Win32.System.SystemInformation",
        vec![Method::extern_fn("GetTickCount", "KERNEL32", TypeSig::U4)],
        Vec::new(),
    );
    b.apis(
        "Windows.Win32.System.Diagnostics.Debug",
        vec![Method::extern_fn("GetLastError", "KERNEL32", TypeSig::U4)],
        Vec::new(),
    );

    // Private namespaces: a releasable-looking handle that is excluded
    // from safe-handle generation.
    b.handle_typedef(
        "Windows.Win32.System.Memory",
        "NamespaceHandle",
        TypeSig::ISize,
        vec![
            AttrDecl::RaiiFree {
                release: "ClosePrivateNamespace".to_string(),
            },
            AttrDecl::NamespaceHandle,
        ],
    );
    b.apis(
        "Windows.Win32.System.Memory",
        vec![
            Method::extern_fn(
                "CreatePrivateNamespace",
                "KERNEL32",
                named("Windows.Win32.System.Memory", "NamespaceHandle"),
            )
            .last_error()
            .param("lpPrivateNamespaceAttributes", ptr(TypeSig::Void))
            .param("lpBoundaryDescriptor", ptr(TypeSig::Void))
            .param("lpAliasPrefix", named(foundation, "PCWSTR")),
            Method::extern_fn("ClosePrivateNamespace", "KERNEL32", named(foundation, "BOOL"))
                .param(
                    "Handle",
                    named("Windows.Win32.System.Memory", "NamespaceHandle"),
                )
                .param("Flags", TypeSig::U4),
        ],
        Vec::new(),
    );

    // Icons: the BOOL-in-field struct plus a handle typed sentinel.
    let ui = "Windows.Win32.UI.WindowsAndMessaging";
    b.structure(
        ui,
        "ICONINFO",
        vec![
            ("fIcon", named(foundation, "BOOL"), Vec::new()),
            ("xHotspot", TypeSig::U4, Vec::new()),
            ("yHotspot", TypeSig::U4, Vec::new()),
            ("hbmMask", named(gdi, "HBITMAP"), Vec::new()),
            ("hbmColor", named(gdi, "HBITMAP"), Vec::new()),
        ],
    );
    b.apis(
        ui,
        Vec::new(),
        vec![(
            "HBMMENU_POPUP_RESTORE",
            named(gdi, "HBITMAP"),
            Some(ConstantValue::I4(9)),
            Vec::new(),
        )],
    );

    // Keyboard input: a struct carrying an anonymous union.
    b.structure_with_union(
        "Windows.Win32.UI.Input.KeyboardAndMouse",
        "INPUT",
        vec![("type", TypeSig::U4)],
        vec![
            ("mi", TypeSig::U8),
            ("ki", TypeSig::U8),
            ("hi", TypeSig::U8),
        ],
    );

    // A bitfield carrier.
    b.structure(
        ui,
        "MENUBARINFO",
        vec![
            ("cbSize", TypeSig::U4, Vec::new()),
            (
                "_bitfield",
                TypeSig::U4,
                vec![
                    AttrDecl::NativeBitfield {
                        name: "fBarFocused".to_string(),
                        offset: 0,
                        length: 1,
                    },
                    AttrDecl::NativeBitfield {
                        name: "fFocused".to_string(),
                        offset: 1,
                        length: 1,
                    },
                ],
            ),
        ],
    );

    // IEEE specials.
    b.apis(
        "Windows.Win32.Media.Multimedia",
        Vec::new(),
        vec![
            (
                "POSITIVE_INFINITY",
                TypeSig::R4,
                Some(ConstantValue::R4(f32::INFINITY)),
                Vec::new(),
            ),
            (
                "NEGATIVE_INFINITY",
                TypeSig::R4,
                Some(ConstantValue::R4(f32::NEG_INFINITY)),
                Vec::new(),
            ),
            ("NaN", TypeSig::R4, Some(ConstantValue::R4(f32::NAN)), Vec::new()),
        ],
    );

    // COM: IUnknown and a spell checking factory on top of it.
    let com = "Windows.Win32.System.Com";
    b.interface(
        com,
        "IUnknown",
        Vec::new(),
        IID_IUNKNOWN,
        vec![
            Method::slot("QueryInterface", named(foundation, "HRESULT"))
                .param("riid", ptr(named("System", "Guid")))
                .out_param("ppvObject", ptr(ptr(TypeSig::Void))),
            Method::slot("AddRef", TypeSig::U4),
            Method::slot("Release", TypeSig::U4),
        ],
    );
    b.interface(
        "Windows.Win32.Globalization",
        "ISpellCheckerFactory",
        vec![TypeName::new(com, "IUnknown")],
        IID_ISPELLCHECKERFACTORY,
        vec![Method::slot("IsSupported", named(foundation, "HRESULT"))
            .param("languageTag", named(foundation, "PCWSTR"))
            .out_param("value", ptr(named(foundation, "BOOL")))],
    );

    // A window procedure delegate.
    b.delegate(
        ui,
        "WNDPROC",
        Method::slot("Invoke", TypeSig::ISize)
            .param("hWnd", named(foundation, "HWND"))
            .param("msg", TypeSig::U4)
            .param("wParam", TypeSig::USize)
            .param("lParam", TypeSig::ISize),
    );

    b.build()
}
