//! Name and token lookup over the loaded metadata.
//!
//! [`MetadataIndex`] owns the model for one generation session and serves
//! every lookup the projection and emission layers need. Misses are `None`
//! or empty iterators, never errors. The index is assembled either by the
//! winmd loader or directly from owned entities (which is how the
//! integration tests drive the emission engine without a binary input).

use rustc_hash::FxHashMap;

use crate::metadata::{
    attributes::AttrDecl,
    model::{FieldDecl, MethodDecl, TypeDecl},
    streams::TableId,
    token::Token,
};

/// A parsed `module.glob` request pattern, e.g. `kernel32.*`.
///
/// The module part is compared case-insensitively against the import module
/// with any `.dll` suffix removed; the glob part supports `*` and `?`.
#[derive(Clone, Debug)]
pub struct ModulePattern {
    module: String,
    glob: String,
}

impl ModulePattern {
    /// Parse a pattern of the form `module.glob`
    ///
    /// Returns `None` when the text has no dot separated glob part.
    #[must_use]
    pub fn parse(pattern: &str) -> Option<ModulePattern> {
        let (module, glob) = pattern.rsplit_once('.')?;
        if module.is_empty() || glob.is_empty() {
            return None;
        }

        Some(ModulePattern {
            module: module.to_ascii_lowercase(),
            glob: glob.to_string(),
        })
    }

    /// True when `module_stem` names this pattern's module
    #[must_use]
    pub fn matches_module(&self, module_stem: &str) -> bool {
        self.module == module_stem
    }

    /// True when the glob part matches `name`
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        glob_match(&self.glob, name)
    }
}

/// Classic glob matching with `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    fn inner(pattern: &[char], text: &[char]) -> bool {
        match pattern.first() {
            None => text.is_empty(),
            Some('*') => {
                (0..=text.len()).any(|skip| inner(&pattern[1..], &text[skip..]))
            }
            Some('?') => !text.is_empty() && inner(&pattern[1..], &text[1..]),
            Some(ch) => text.first() == Some(ch) && inner(&pattern[1..], &text[1..]),
        }
    }

    inner(&pattern, &text)
}

/// Random access and name lookup over the loaded types, methods and
/// constants of one metadata file.
pub struct MetadataIndex {
    types: Vec<TypeDecl>,
    by_token: FxHashMap<Token, usize>,
    by_full_name: FxHashMap<String, usize>,
    by_short_name: FxHashMap<String, Vec<usize>>,
    methods_by_token: FxHashMap<Token, (usize, usize)>,
    methods_by_name: FxHashMap<String, Vec<(usize, usize)>>,
    constants_by_token: FxHashMap<Token, (usize, usize)>,
    constants_by_name: FxHashMap<String, (usize, usize)>,
    associated_constants: FxHashMap<String, Vec<(usize, usize)>>,
}

impl MetadataIndex {
    /// Assemble an index from already loaded entities.
    ///
    /// Used by the winmd loader and by tests that build fixture metadata in
    /// code. Later duplicates of a full name do not displace earlier ones.
    #[must_use]
    pub fn from_types(types: Vec<TypeDecl>) -> MetadataIndex {
        let mut index = MetadataIndex {
            types,
            by_token: FxHashMap::default(),
            by_full_name: FxHashMap::default(),
            by_short_name: FxHashMap::default(),
            methods_by_token: FxHashMap::default(),
            methods_by_name: FxHashMap::default(),
            constants_by_token: FxHashMap::default(),
            constants_by_name: FxHashMap::default(),
            associated_constants: FxHashMap::default(),
        };

        for (type_idx, decl) in index.types.iter().enumerate() {
            index.by_token.insert(decl.token, type_idx);
            index
                .by_full_name
                .entry(format!("{}.{}", decl.namespace, decl.name))
                .or_insert(type_idx);
            index
                .by_short_name
                .entry(decl.name.clone())
                .or_default()
                .push(type_idx);

            for (method_idx, method) in decl.methods.iter().enumerate() {
                index
                    .methods_by_token
                    .insert(method.token, (type_idx, method_idx));
                index
                    .methods_by_name
                    .entry(method.name.clone())
                    .or_default()
                    .push((type_idx, method_idx));
            }

            for (field_idx, field) in decl.fields.iter().enumerate() {
                if !field.is_literal() {
                    continue;
                }

                index
                    .constants_by_token
                    .insert(field.token, (type_idx, field_idx));
                index
                    .constants_by_name
                    .entry(field.name.clone())
                    .or_insert((type_idx, field_idx));

                if let Some(enum_name) = field.associated_enum() {
                    index
                        .associated_constants
                        .entry(enum_name.to_string())
                        .or_default()
                        .push((type_idx, field_idx));
                }
            }
        }

        index
    }

    /// All loaded types, in metadata order
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.iter()
    }

    /// All non-nested types, in metadata order
    pub fn top_level_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.iter().filter(|decl| decl.enclosing.is_none())
    }

    /// Find a type by namespace and name
    #[must_use]
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<&TypeDecl> {
        let key = format!("{namespace}.{name}");
        self.by_full_name.get(&key).map(|idx| &self.types[*idx])
    }

    /// Find a type by short name anywhere in the metadata
    #[must_use]
    pub fn find_type_anywhere(&self, name: &str) -> Option<&TypeDecl> {
        self.by_short_name
            .get(name)
            .and_then(|candidates| candidates.first())
            .map(|idx| &self.types[*idx])
    }

    /// Resolve a `TypeDef` token
    #[must_use]
    pub fn type_by_token(&self, token: Token) -> Option<&TypeDecl> {
        self.by_token.get(&token).map(|idx| &self.types[*idx])
    }

    /// Walk the enclosing chain of a type up to its top level ancestor
    #[must_use]
    pub fn top_level_of(&self, token: Token) -> Option<&TypeDecl> {
        let mut current = self.type_by_token(token)?;
        while let Some(enclosing) = current.enclosing {
            current = self.type_by_token(enclosing)?;
        }
        Some(current)
    }

    /// Find an extern method by native module and name
    #[must_use]
    pub fn find_method(&self, module: &str, name: &str) -> Option<&MethodDecl> {
        let module = module.to_ascii_lowercase();
        let module = module.strip_suffix(".dll").unwrap_or(&module);

        self.methods_by_name.get(name).and_then(|candidates| {
            candidates
                .iter()
                .map(|(type_idx, method_idx)| &self.types[*type_idx].methods[*method_idx])
                .find(|method| {
                    method
                        .pinvoke
                        .as_ref()
                        .is_some_and(|pinvoke| pinvoke.module_stem() == module)
                })
        })
    }

    /// Find a method by name anywhere in the metadata
    #[must_use]
    pub fn find_method_anywhere(&self, name: &str) -> Option<&MethodDecl> {
        self.methods_by_name
            .get(name)
            .and_then(|candidates| candidates.first())
            .map(|(type_idx, method_idx)| &self.types[*type_idx].methods[*method_idx])
    }

    /// Resolve a `MethodDef` token to its owner and declaration
    #[must_use]
    pub fn method_by_token(&self, token: Token) -> Option<(&TypeDecl, &MethodDecl)> {
        self.methods_by_token.get(&token).map(|(type_idx, method_idx)| {
            let owner = &self.types[*type_idx];
            (owner, &owner.methods[*method_idx])
        })
    }

    /// All extern methods whose import matches the pattern, in metadata order
    pub fn methods_by_module_pattern<'a>(
        &'a self,
        pattern: &'a ModulePattern,
    ) -> impl Iterator<Item = &'a MethodDecl> + 'a {
        self.types.iter().flat_map(move |decl| {
            decl.methods.iter().filter(move |method| {
                method.pinvoke.as_ref().is_some_and(|pinvoke| {
                    pattern.matches_module(&pinvoke.module_stem())
                        && pattern.matches_name(&method.name)
                })
            })
        })
    }

    /// Find a constant by name anywhere in the metadata
    #[must_use]
    pub fn find_constant_anywhere(&self, name: &str) -> Option<(&TypeDecl, &FieldDecl)> {
        self.constants_by_name.get(name).map(|(type_idx, field_idx)| {
            let owner = &self.types[*type_idx];
            (owner, &owner.fields[*field_idx])
        })
    }

    /// Resolve a Field token of a constant to its owner and declaration
    #[must_use]
    pub fn constant_by_token(&self, token: Token) -> Option<(&TypeDecl, &FieldDecl)> {
        self.constants_by_token.get(&token).map(|(type_idx, field_idx)| {
            let owner = &self.types[*type_idx];
            (owner, &owner.fields[*field_idx])
        })
    }

    /// Decoded attributes of a loaded entity, by its token.
    ///
    /// Accepts `TypeDef`, `MethodDef` and constant Field tokens; anything
    /// else yields an empty slice.
    #[must_use]
    pub fn attributes_of(&self, token: Token) -> &[AttrDecl] {
        match token.table_id() {
            Some(TableId::TypeDef) => self
                .type_by_token(token)
                .map(|decl| decl.attrs.as_slice())
                .unwrap_or(&[]),
            Some(TableId::MethodDef) => self
                .method_by_token(token)
                .map(|(_, method)| method.attrs.as_slice())
                .unwrap_or(&[]),
            Some(TableId::Field) => self
                .constant_by_token(token)
                .map(|(_, field)| field.attrs.as_slice())
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Constants tagged for adoption into the named enum's body
    #[must_use]
    pub fn constants_for_enum(&self, enum_name: &str) -> Vec<(&TypeDecl, &FieldDecl)> {
        self.associated_constants
            .get(enum_name)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(type_idx, field_idx)| {
                        let owner = &self.types[*type_idx];
                        (owner, &owner.fields[*field_idx])
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
