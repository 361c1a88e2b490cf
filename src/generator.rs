//! The generation facade.
//!
//! A [`Generator`] owns one metadata index, one collision resolver and one
//! fragment store for the lifetime of a session. Requests resolve names
//! into emission keys and drain the pending queue; cooperative cancellation
//! is observed between enumeration items and between pending pops. The
//! generator is single threaded by design; callers wanting parallelism run
//! independent generators.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    accumulator::{FragmentStore, SourceFile},
    collision::{CollisionResolver, CompilationView},
    emit::{self, EmissionKey, EmitCtx},
    file::File,
    metadata::{index::MetadataIndex, index::ModulePattern, loader, model::TypeKind},
    Error, Result,
};

/// The API the generator refuses to emit; its semantics cannot survive the
/// managed-to-native transition, callers must use
/// `std::io::Error::last_os_error()` instead.
const FORBIDDEN_METHOD: &str = "GetLastError";

/// Options of one generation session.
#[derive(Clone, Debug)]
pub struct GeneratorOptions {
    /// Name of the container struct extern methods hang off
    pub class_name: String,
    /// Concatenate all fragments into a single compilation unit
    pub emit_single_file: bool,
    /// The dotted namespace generated types are mounted under
    pub namespace: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            class_name: "PInvoke".to_string(),
            emit_single_file: false,
            namespace: "Microsoft.Windows.Sdk".to_string(),
        }
    }
}

/// Cooperative cancellation token.
///
/// Cloneable; all clones observe the same flag. Checked between metadata
/// enumeration items and between pending emissions.
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, uncancelled token
    #[must_use]
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Request cancellation; observed at the next checkpoint
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True when cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// One generation session over one metadata file.
pub struct Generator {
    index: MetadataIndex,
    options: GeneratorOptions,
    resolver: CollisionResolver,
    store: FragmentStore,
}

impl Generator {
    /// Create a generator over an already assembled index.
    ///
    /// ## Arguments
    /// * 'index'   - The metadata index to generate from
    /// * 'options' - Session options
    /// * 'view'    - The host's snapshot of the consuming compilation
    #[must_use]
    pub fn new(index: MetadataIndex, options: GeneratorOptions, view: CompilationView) -> Generator {
        let resolver = CollisionResolver::new(view, &options.namespace);
        Generator {
            index,
            options,
            resolver,
            store: FragmentStore::new(),
        }
    }

    /// Open a `.winmd` file and create a generator over it.
    ///
    /// The file stays open for the lifetime of the generator and is
    /// released when the generator is dropped.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its metadata is
    /// malformed.
    pub fn from_file(
        path: &Path,
        options: GeneratorOptions,
        view: CompilationView,
    ) -> Result<Generator> {
        let file = File::from_file(path)?;
        Ok(Generator::new(loader::load_index(&file)?, options, view))
    }

    /// Create a generator over metadata already loaded into memory.
    ///
    /// # Errors
    /// Returns an error if the buffer is not a well formed metadata file.
    pub fn from_bytes(
        data: Vec<u8>,
        options: GeneratorOptions,
        view: CompilationView,
    ) -> Result<Generator> {
        let file = File::from_mem(data)?;
        Ok(Generator::new(loader::load_index(&file)?, options, view))
    }

    /// Generate an entity by exact name.
    ///
    /// The name may be a namespace qualified or short type name, a method
    /// name, or a constant name; the first match in that order wins.
    /// Returns whether anything was resolved; an unknown name is a soft
    /// miss, not an error.
    ///
    /// # Errors
    /// [`Error::NotSupported`] for a direct request of `GetLastError`;
    /// [`Error::Cancelled`] when the token fires.
    pub fn generate(&mut self, name: &str, token: &CancellationToken) -> Result<bool> {
        token.checkpoint()?;

        let short = name.rsplit_once('.').map_or(name, |(_, short)| short);
        if short == FORBIDDEN_METHOD {
            return Err(Error::NotSupported(format!(
                "'{FORBIDDEN_METHOD}' is not emitted; use std::io::Error::last_os_error()"
            )));
        }

        log::debug!("request: generate '{name}'");

        let key = self.resolve_request(name);
        let Some(key) = key else {
            log::debug!("request '{name}' matched nothing");
            return Ok(false);
        };

        self.store.enqueue(key);
        self.drain(token)?;
        Ok(true)
    }

    fn resolve_request(&self, name: &str) -> Option<EmissionKey> {
        if let Some((namespace, short)) = name.rsplit_once('.') {
            if let Some(decl) = self.index.find_type(namespace, short) {
                return Some(EmissionKey::Type(decl.token));
            }
        }

        if let Some(decl) = self.index.find_type_anywhere(name) {
            return Some(EmissionKey::Type(decl.token));
        }
        if let Some(method) = self.index.find_method_anywhere(name) {
            return Some(EmissionKey::Method(method.token));
        }
        if let Some((_, field)) = self.index.find_constant_anywhere(name) {
            return Some(EmissionKey::Constant(field.token));
        }

        None
    }

    /// Generate every native function matching a `module.glob` pattern,
    /// e.g. `kernel32.*`.
    ///
    /// Forbidden entries are skipped silently. Returns whether any method
    /// matched.
    ///
    /// # Errors
    /// [`Error::Cancelled`] when the token fires.
    pub fn generate_module(&mut self, pattern: &str, token: &CancellationToken) -> Result<bool> {
        token.checkpoint()?;

        let Some(pattern) = ModulePattern::parse(pattern) else {
            return Ok(false);
        };

        let mut keys = Vec::new();
        for method in self.index.methods_by_module_pattern(&pattern) {
            token.checkpoint()?;
            if method.name == FORBIDDEN_METHOD {
                continue;
            }
            keys.push(EmissionKey::Method(method.token));
        }

        log::debug!("module pattern matched {} methods", keys.len());

        let produced = !keys.is_empty();
        for key in keys {
            self.store.enqueue(key);
        }
        self.drain(token)?;
        Ok(produced)
    }

    /// Generate every eligible top level type and native function.
    ///
    /// # Errors
    /// [`Error::Cancelled`] when the token fires.
    pub fn generate_all(&mut self, token: &CancellationToken) -> Result<bool> {
        token.checkpoint()?;

        let mut keys = Vec::new();
        for decl in self.index.top_level_types() {
            token.checkpoint()?;

            if decl.kind != TypeKind::Class {
                keys.push(EmissionKey::Type(decl.token));
            }

            for method in &decl.methods {
                if method.pinvoke.is_some() && method.name != FORBIDDEN_METHOD {
                    keys.push(EmissionKey::Method(method.token));
                }
            }
        }

        let produced = !keys.is_empty();
        for key in keys {
            self.store.enqueue(key);
        }
        self.drain(token)?;
        Ok(produced)
    }

    fn drain(&mut self, token: &CancellationToken) -> Result<()> {
        while let Some(key) = self.store.pop_pending() {
            token.checkpoint()?;

            if self.store.contains(key) {
                continue;
            }

            let outcome = {
                let ctx = EmitCtx {
                    index: &self.index,
                    options: &self.options,
                    resolver: &self.resolver,
                };
                emit::emit(key, &ctx)?
            };

            let (fragment, deps) = outcome;
            if let Some(fragment) = fragment {
                log::debug!("emitted {} ({:?})", fragment.symbol, fragment.key);
                self.resolver.record_emitted(&fragment.symbol, fragment.kind);
                self.store.insert(fragment);
            }
            for dep in deps {
                self.store.enqueue(dep);
            }
        }

        Ok(())
    }

    /// The session options
    #[must_use]
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Number of fragments accumulated so far
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.store.len()
    }

    /// Render everything accumulated so far into compilation units.
    ///
    /// Accessible after cancellation too; a cancelled session simply
    /// exposes what was emitted before the token fired.
    #[must_use]
    pub fn files(&self) -> Vec<SourceFile> {
        self.store.files(&self.options)
    }
}
