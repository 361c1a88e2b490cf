//! Collision handling against the consuming compilation.
//!
//! The host snapshots what the consuming crate already declares (its own
//! symbols plus anything an upstream generator emitted) into a
//! [`CompilationView`]. The resolver then answers two questions per
//! emission: how a reference to a name must be rendered, and whether a
//! declaration should be emitted at all.

use rustc_hash::FxHashMap;

/// The kind of a declared or emitted symbol.
///
/// Used to decide whether a user declaration is equivalent to a pending
/// metadata emission (same name, same kind) or merely colliding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Sequential layout struct
    Struct,
    /// Overlapping layout union
    Union,
    /// Integer backed enum
    Enum,
    /// COM interface
    Interface,
    /// Function pointer alias
    Delegate,
    /// Extern or wrapper function
    Function,
    /// Typed constant
    Constant,
    /// Handle typedef newtype
    Handle,
    /// Owning safe-handle wrapper
    SafeHandle,
    /// The extern method container or another plain type
    Class,
}

/// An immutable snapshot of the consuming compilation.
#[derive(Clone, Default)]
pub struct CompilationView {
    declared: FxHashMap<String, SymbolKind>,
    upstream: FxHashMap<String, String>,
    upstream_visible: bool,
}

impl CompilationView {
    /// An empty view, for hosts with nothing pre-declared
    #[must_use]
    pub fn new() -> CompilationView {
        CompilationView::default()
    }

    /// Record a symbol the consuming compilation declares
    pub fn declare(&mut self, name: &str, kind: SymbolKind) {
        self.declared.insert(name.to_string(), kind);
    }

    /// Record an entity emitted by an upstream generator, with the path its
    /// references should use
    pub fn add_upstream(&mut self, name: &str, path: &str) {
        self.upstream.insert(name.to_string(), path.to_string());
    }

    /// Whether upstream emissions are visible to this compilation
    pub fn set_upstream_visibility(&mut self, visible: bool) {
        self.upstream_visible = visible;
    }
}

/// Per-session collision state: the host view plus everything emitted so
/// far.
pub struct CollisionResolver {
    view: CompilationView,
    qualified_root: String,
    emitted: FxHashMap<String, SymbolKind>,
}

impl CollisionResolver {
    /// Create a resolver for one generation session
    ///
    /// ## Arguments
    /// * 'view'      - The host's compilation snapshot
    /// * 'namespace' - The dotted namespace generated types live under
    #[must_use]
    pub fn new(view: CompilationView, namespace: &str) -> CollisionResolver {
        let mut qualified_root = String::from("crate");
        for segment in namespace.split('.').filter(|segment| !segment.is_empty()) {
            qualified_root.push_str("::");
            qualified_root.push_str(segment);
        }

        CollisionResolver {
            view,
            qualified_root,
            emitted: FxHashMap::default(),
        }
    }

    /// Render a reference to a generated entity.
    ///
    /// Short by default; fully qualified through the generated namespace
    /// when the consuming compilation declares an unrelated symbol of the
    /// same name; rebound to the upstream path when an upstream generator
    /// already emitted the entity and visibility is granted.
    #[must_use]
    pub fn reference(&self, name: &str, kind: SymbolKind) -> String {
        match self.view.declared.get(name) {
            Some(user_kind) if *user_kind == kind => name.to_string(),
            Some(_) => format!("{}::{}", self.qualified_root, name),
            None => {
                if self.view.upstream_visible {
                    if let Some(path) = self.view.upstream.get(name) {
                        return path.clone();
                    }
                }
                name.to_string()
            }
        }
    }

    /// Whether an entity should be emitted at all.
    ///
    /// False when the consuming compilation already declares an equivalent
    /// entity (the user's declaration wins and references rebind to it),
    /// when a visible upstream generator already emitted it, or when this
    /// session already emitted a distinct entity under the same short name
    /// (references rebind to the first emission).
    #[must_use]
    pub fn should_emit(&self, name: &str, kind: SymbolKind) -> bool {
        if self.view.declared.get(name) == Some(&kind) {
            return false;
        }

        if self.view.upstream_visible && self.view.upstream.contains_key(name) {
            return false;
        }

        if self.emitted.contains_key(name) {
            return false;
        }

        true
    }

    /// Record a completed emission
    pub fn record_emitted(&mut self, name: &str, kind: SymbolKind) {
        self.emitted.insert(name.to_string(), kind);
    }

    /// The kind a name was already emitted as this session, if any
    #[must_use]
    pub fn emitted_kind(&self, name: &str) -> Option<SymbolKind> {
        self.emitted.get(name).copied()
    }
}
