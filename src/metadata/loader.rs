//! Folds the physical metadata tables into the owned model.
//!
//! Runs once per session. The fold resolves every cross-table reference up
//! front (field and method runs, P/Invoke imports, constants, layouts,
//! custom attributes, nesting, interface lists) so the rest of the crate
//! never sees a heap index or coded index again.

use rustc_hash::FxHashMap;
use widestring::U16Str;

use crate::{
    file::File,
    metadata::{
        attributes::{self, AttrDecl},
        cor20::Cor20Header,
        index::MetadataIndex,
        model::{
            ConstantValue, FieldDecl, MethodDecl, ParamDecl, PInvokeInfo, TypeDecl, TypeKind,
            TypeLayout,
        },
        root::Root,
        signatures::{SignatureParser, TypeName},
        streams::{Blob, Guid, Strings, TableId, TablesStream},
        tables::{
            ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldLayoutRaw, FieldRaw,
            ImplMapRaw, InterfaceImplRaw, MemberRefRaw, MethodDefRaw, ModuleRaw, ModuleRefRaw,
            NestedClassRaw, ParamRaw, TypeAttributes, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
    },
    Result,
};

/// Load a metadata file into an index.
///
/// # Errors
/// Returns an error if any physical structure is malformed. Lookup level
/// inconsistencies (a missing run boundary, an unresolvable token) are
/// malformed metadata too; this loader does not guess.
pub fn load_index(file: &File) -> Result<MetadataIndex> {
    let (clr_rva, _) = file.clr();
    let clr_offset = file.rva_to_offset(clr_rva)?;
    let cor20 = Cor20Header::read(file.data_slice(clr_offset, 72)?)?;

    let meta_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
    let meta = file.data_slice(meta_offset, cor20.meta_data_size as usize)?;

    let root = Root::read(meta)?;
    let stream = |name: &str| -> Result<&[u8]> {
        match root.stream(name) {
            Some(header) => {
                Ok(&meta[header.offset as usize..(header.offset + header.size) as usize])
            }
            None => Err(malformed_error!("Metadata has no '{}' stream", name)),
        }
    };

    let strings = Strings::from(stream("#Strings")?)?;
    let blob = Blob::from(stream("#Blob")?)?;
    let tables = TablesStream::from(stream("#~")?)?;

    if let (Some(modules), Ok(guids)) = (
        tables.table::<ModuleRaw>(TableId::Module),
        stream("#GUID").and_then(Guid::from),
    ) {
        if let Some(module) = modules.get(1) {
            if let (Ok(name), Ok(mvid)) = (
                strings.get(module.name as usize),
                guids.get(module.mvid as usize),
            ) {
                log::debug!("loading module {name} ({mvid})");
            }
        }
    }

    let typedefs: Vec<TypeDefRaw> = tables
        .table::<TypeDefRaw>(TableId::TypeDef)
        .map(|table| table.iter().collect())
        .unwrap_or_default();
    let typerefs: Vec<TypeRefRaw> = tables
        .table::<TypeRefRaw>(TableId::TypeRef)
        .map(|table| table.iter().collect())
        .unwrap_or_default();
    let fields_raw: Vec<FieldRaw> = tables
        .table::<FieldRaw>(TableId::Field)
        .map(|table| table.iter().collect())
        .unwrap_or_default();
    let methods_raw: Vec<MethodDefRaw> = tables
        .table::<MethodDefRaw>(TableId::MethodDef)
        .map(|table| table.iter().collect())
        .unwrap_or_default();
    let params_raw: Vec<ParamRaw> = tables
        .table::<ParamRaw>(TableId::Param)
        .map(|table| table.iter().collect())
        .unwrap_or_default();

    // Token to name resolution for signature parsing.
    let resolve = |token: Token| -> Result<TypeName> {
        if token.row() == 0 {
            return Err(crate::Error::TypeNotFound(token));
        }
        match token.table_id() {
            Some(TableId::TypeDef) => match typedefs.get(token.row() as usize - 1) {
                Some(row) => Ok(TypeName::new(
                    strings.get(row.type_namespace as usize)?,
                    strings.get(row.type_name as usize)?,
                )),
                None => Err(crate::Error::TypeNotFound(token)),
            },
            Some(TableId::TypeRef) => match typerefs.get(token.row() as usize - 1) {
                Some(row) => Ok(TypeName::new(
                    strings.get(row.type_namespace as usize)?,
                    strings.get(row.type_name as usize)?,
                )),
                None => Err(crate::Error::TypeNotFound(token)),
            },
            _ => Err(crate::Error::TypeNotFound(token)),
        }
    };

    // P/Invoke facts keyed by MethodDef token.
    let mut pinvokes: FxHashMap<Token, PInvokeInfo> = FxHashMap::default();
    if let Some(implmaps) = tables.table::<ImplMapRaw>(TableId::ImplMap) {
        let modulerefs: Vec<ModuleRefRaw> = tables
            .table::<ModuleRefRaw>(TableId::ModuleRef)
            .map(|table| table.iter().collect())
            .unwrap_or_default();

        for row in implmaps.iter() {
            let Some(module_row) = modulerefs.get(row.import_scope as usize - 1) else {
                return Err(malformed_error!(
                    "ImplMap references missing ModuleRef - {}",
                    row.import_scope
                ));
            };

            pinvokes.insert(
                row.member_forwarded.token,
                PInvokeInfo {
                    module: strings.get(module_row.name as usize)?.to_string(),
                    entry_point: strings.get(row.import_name as usize)?.to_string(),
                    flags: row.attributes(),
                },
            );
        }
    }

    // Constant payloads keyed by parent token.
    let mut constants: FxHashMap<Token, ConstantValue> = FxHashMap::default();
    if let Some(table) = tables.table::<ConstantRaw>(TableId::Constant) {
        for row in table.iter() {
            let payload = blob.get(row.value as usize)?;
            constants.insert(row.parent.token, decode_constant(row.base_type, payload)?);
        }
    }

    // Explicit field offsets keyed by Field token.
    let mut field_offsets: FxHashMap<Token, u32> = FxHashMap::default();
    if let Some(table) = tables.table::<FieldLayoutRaw>(TableId::FieldLayout) {
        for row in table.iter() {
            field_offsets.insert(Token::for_row(TableId::Field, row.field), row.field_offset);
        }
    }

    // Packing overrides keyed by TypeDef rid.
    let mut packings: FxHashMap<u32, u16> = FxHashMap::default();
    if let Some(table) = tables.table::<ClassLayoutRaw>(TableId::ClassLayout) {
        for row in table.iter() {
            packings.insert(row.parent, row.packing_size);
        }
    }

    // Custom attributes decoded and grouped by parent token.
    let mut attrs: FxHashMap<Token, Vec<AttrDecl>> = FxHashMap::default();
    if let Some(table) = tables.table::<CustomAttributeRaw>(TableId::CustomAttribute) {
        let memberrefs: Vec<MemberRefRaw> = tables
            .table::<MemberRefRaw>(TableId::MemberRef)
            .map(|t| t.iter().collect())
            .unwrap_or_default();

        for row in table.iter() {
            let attr_type = match row.constructor.tag {
                TableId::MemberRef => {
                    let Some(ctor) = memberrefs.get(row.constructor.row as usize - 1) else {
                        return Err(malformed_error!(
                            "CustomAttribute constructor out of range - {}",
                            row.constructor.row
                        ));
                    };
                    resolve(ctor.class.token)?.name
                }
                TableId::MethodDef => {
                    match owner_of_method(&typedefs, methods_raw.len(), row.constructor.row) {
                        Some(owner) => strings.get(owner.type_name as usize)?.to_string(),
                        None => continue,
                    }
                }
                _ => continue,
            };

            let payload = blob.get(row.value as usize)?;
            // Other assemblies reuse short attribute names with different
            // argument shapes; a payload mismatch demotes to Unknown
            // instead of poisoning the load.
            let decoded = attributes::decode(&attr_type, payload).unwrap_or_else(|_| {
                AttrDecl::Unknown {
                    name: attr_type.clone(),
                }
            });
            attrs.entry(row.parent.token).or_default().push(decoded);
        }
    }

    // Nesting links, both directions, by TypeDef token.
    let mut enclosing: FxHashMap<Token, Token> = FxHashMap::default();
    let mut nested: FxHashMap<Token, Vec<Token>> = FxHashMap::default();
    if let Some(table) = tables.table::<NestedClassRaw>(TableId::NestedClass) {
        for row in table.iter() {
            let inner = Token::for_row(TableId::TypeDef, row.nested_class);
            let outer = Token::for_row(TableId::TypeDef, row.enclosing_class);
            enclosing.insert(inner, outer);
            nested.entry(outer).or_default().push(inner);
        }
    }

    // Interface lists by implementing TypeDef rid, in declaration order.
    let mut interfaces: FxHashMap<u32, Vec<TypeName>> = FxHashMap::default();
    if let Some(table) = tables.table::<InterfaceImplRaw>(TableId::InterfaceImpl) {
        for row in table.iter() {
            interfaces
                .entry(row.class)
                .or_default()
                .push(resolve(row.interface.token)?);
        }
    }

    let mut types = Vec::with_capacity(typedefs.len());
    for (idx, row) in typedefs.iter().enumerate() {
        let name = strings.get(row.type_name as usize)?;
        let namespace = strings.get(row.type_namespace as usize)?;
        if name == "<Module>" {
            continue;
        }

        let next = typedefs.get(idx + 1);
        let fields_end = next
            .map(|row| row.field_list)
            .unwrap_or(fields_raw.len() as u32 + 1);
        let methods_end = next
            .map(|row| row.method_list)
            .unwrap_or(methods_raw.len() as u32 + 1);

        let mut fields = Vec::new();
        for rid in row.field_list.max(1)..fields_end {
            let Some(raw) = fields_raw.get(rid as usize - 1) else {
                return Err(malformed_error!("Field run out of range - {}", rid));
            };

            let sig_blob = blob.get(raw.signature as usize)?;
            let sig = SignatureParser::new(sig_blob, resolve).parse_field_signature()?;

            fields.push(FieldDecl {
                token: raw.token,
                name: strings.get(raw.name as usize)?.to_string(),
                sig,
                flags: raw.attributes(),
                constant: constants.get(&raw.token).cloned(),
                attrs: attrs.remove(&raw.token).unwrap_or_default(),
                offset: field_offsets.get(&raw.token).copied(),
            });
        }

        let mut methods = Vec::new();
        for rid in row.method_list.max(1)..methods_end {
            let Some(raw) = methods_raw.get(rid as usize - 1) else {
                return Err(malformed_error!("Method run out of range - {}", rid));
            };

            let sig_blob = blob.get(raw.signature as usize)?;
            let sig = SignatureParser::new(sig_blob, resolve).parse_method_signature()?;

            let params_end = methods_raw
                .get(rid as usize)
                .map(|next| next.param_list)
                .unwrap_or(params_raw.len() as u32 + 1);

            let mut params = Vec::new();
            for param_rid in raw.param_list.max(1)..params_end {
                let Some(param) = params_raw.get(param_rid as usize - 1) else {
                    return Err(malformed_error!("Param run out of range - {}", param_rid));
                };

                params.push(ParamDecl {
                    name: strings.get(param.name as usize)?.to_string(),
                    sequence: param.sequence,
                    flags: param.attributes(),
                    attrs: attrs.remove(&param.token).unwrap_or_default(),
                });
            }

            methods.push(MethodDecl {
                token: raw.token,
                name: strings.get(raw.name as usize)?.to_string(),
                sig,
                params,
                flags: raw.attributes(),
                pinvoke: pinvokes.remove(&raw.token),
                attrs: attrs.remove(&raw.token).unwrap_or_default(),
            });
        }

        let base = if row.extends.row == 0 {
            None
        } else {
            Some(resolve(row.extends.token)?)
        };

        let type_attrs = attrs.remove(&row.token).unwrap_or_default();
        let kind = classify(row, base.as_ref(), &type_attrs);
        let layout = layout_of(row, packings.get(&row.rid).copied());
        let guid = type_attrs.iter().find_map(|attr| match attr {
            AttrDecl::Guid { value } => Some(*value),
            _ => None,
        });

        types.push(TypeDecl {
            token: row.token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            layout,
            base,
            fields,
            methods,
            interfaces: interfaces.remove(&row.rid).unwrap_or_default(),
            attrs: type_attrs,
            enclosing: enclosing.get(&row.token).copied(),
            nested: nested.remove(&row.token).unwrap_or_default(),
            guid,
        });
    }

    log::info!("loaded {} types from metadata", types.len());
    Ok(MetadataIndex::from_types(types))
}

/// Find the TypeDef owning a method rid through the method run boundaries.
fn owner_of_method<'a>(
    typedefs: &'a [TypeDefRaw],
    total_methods: usize,
    method_rid: u32,
) -> Option<&'a TypeDefRaw> {
    for (idx, row) in typedefs.iter().enumerate() {
        let end = typedefs
            .get(idx + 1)
            .map(|next| next.method_list)
            .unwrap_or(total_methods as u32 + 1);
        if method_rid >= row.method_list && method_rid < end {
            return Some(row);
        }
    }
    None
}

fn classify(row: &TypeDefRaw, base: Option<&TypeName>, attrs: &[AttrDecl]) -> TypeKind {
    if row.attributes().contains(TypeAttributes::INTERFACE) {
        return TypeKind::Interface;
    }

    let base_full = base.map(|name| format!("{name}"));
    match base_full.as_deref() {
        Some("System.Enum") => TypeKind::Enum,
        Some("System.MulticastDelegate") => TypeKind::Delegate,
        Some("System.ValueType") => {
            if attrs.iter().any(|attr| matches!(attr, AttrDecl::NativeTypedef)) {
                TypeKind::HandleTypedef
            } else if row.attributes().contains(TypeAttributes::EXPLICIT_LAYOUT) {
                TypeKind::Union
            } else {
                TypeKind::Struct
            }
        }
        _ => TypeKind::Class,
    }
}

fn layout_of(row: &TypeDefRaw, pack: Option<u16>) -> TypeLayout {
    let attrs = row.attributes();
    if attrs.contains(TypeAttributes::EXPLICIT_LAYOUT) {
        TypeLayout::Explicit
    } else if attrs.contains(TypeAttributes::SEQUENTIAL_LAYOUT) {
        TypeLayout::Sequential {
            pack: pack.filter(|value| *value != 0),
        }
    } else {
        TypeLayout::Auto
    }
}

fn decode_constant(base_type: u8, payload: &[u8]) -> Result<ConstantValue> {
    use crate::file::io::read_le;
    use crate::metadata::signatures::ELEMENT_TYPE;

    Ok(match base_type {
        ELEMENT_TYPE::BOOLEAN => ConstantValue::Bool(read_le::<u8>(payload)? != 0),
        ELEMENT_TYPE::CHAR => ConstantValue::Char(read_le::<u16>(payload)?),
        ELEMENT_TYPE::I1 => ConstantValue::I1(read_le::<i8>(payload)?),
        ELEMENT_TYPE::U1 => ConstantValue::U1(read_le::<u8>(payload)?),
        ELEMENT_TYPE::I2 => ConstantValue::I2(read_le::<i16>(payload)?),
        ELEMENT_TYPE::U2 => ConstantValue::U2(read_le::<u16>(payload)?),
        ELEMENT_TYPE::I4 => ConstantValue::I4(read_le::<i32>(payload)?),
        ELEMENT_TYPE::U4 => ConstantValue::U4(read_le::<u32>(payload)?),
        ELEMENT_TYPE::I8 => ConstantValue::I8(read_le::<i64>(payload)?),
        ELEMENT_TYPE::U8 => ConstantValue::U8(read_le::<u64>(payload)?),
        ELEMENT_TYPE::R4 => ConstantValue::R4(read_le::<f32>(payload)?),
        ELEMENT_TYPE::R8 => ConstantValue::R8(read_le::<f64>(payload)?),
        ELEMENT_TYPE::STRING => {
            let units: Vec<u16> = payload
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            ConstantValue::String(U16Str::from_slice(&units).to_string_lossy())
        }
        0x12 => ConstantValue::Null,
        other => {
            return Err(malformed_error!(
                "Unsupported constant type - 0x{:02x}",
                other
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_decode() {
        assert_eq!(
            decode_constant(0x08, &2i32.to_le_bytes()).unwrap(),
            ConstantValue::I4(2)
        );
        assert_eq!(
            decode_constant(0x02, &[0x01]).unwrap(),
            ConstantValue::Bool(true)
        );

        let nan = decode_constant(0x0C, &f32::NAN.to_le_bytes()).unwrap();
        match nan {
            ConstantValue::R4(value) => assert!(value.is_nan()),
            other => panic!("expected R4, got {other:?}"),
        }

        let text: Vec<u8> = "Ok".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(
            decode_constant(0x0E, &text).unwrap(),
            ConstantValue::String("Ok".to_string())
        );
    }

    #[test]
    fn method_owner_resolution() {
        let row = |rid: u32, method_list: u32| TypeDefRaw {
            rid,
            token: Token::for_row(TableId::TypeDef, rid),
            flags: 0,
            type_name: 0,
            type_namespace: 0,
            extends: crate::metadata::streams::CodedIndex::new(TableId::TypeDef, 0),
            field_list: 1,
            method_list,
        };

        let typedefs = vec![row(1, 1), row(2, 3), row(3, 6)];
        assert_eq!(owner_of_method(&typedefs, 8, 1).unwrap().rid, 1);
        assert_eq!(owner_of_method(&typedefs, 8, 2).unwrap().rid, 1);
        assert_eq!(owner_of_method(&typedefs, 8, 3).unwrap().rid, 2);
        assert_eq!(owner_of_method(&typedefs, 8, 7).unwrap().rid, 3);
    }
}
