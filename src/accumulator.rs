//! Fragment accumulation.
//!
//! An insertion ordered, key deduplicated store of emitted fragments plus
//! the pending work queue that drives emission. Cyclic dependency graphs
//! terminate because a key already present (or already queued) is never
//! queued again and the reachable key set is bounded by the metadata.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    emit::{EmissionKey, Fragment},
    generator::GeneratorOptions,
};

/// One rendered compilation unit handed back to the host.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Logical file path, e.g. `HANDLE.rs`
    pub path: String,
    /// The source text; re-parses cleanly as Rust
    pub contents: String,
}

/// The per-session fragment store and work queue.
#[derive(Default)]
pub struct FragmentStore {
    fragments: Vec<Fragment>,
    by_key: FxHashMap<EmissionKey, usize>,
    pending: VecDeque<EmissionKey>,
    queued: FxHashSet<EmissionKey>,
}

impl FragmentStore {
    /// An empty store
    #[must_use]
    pub fn new() -> FragmentStore {
        FragmentStore::default()
    }

    /// True when a fragment for `key` was already emitted
    #[must_use]
    pub fn contains(&self, key: EmissionKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Number of emitted fragments
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// True when nothing was emitted yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Queue a key for emission unless it is already emitted or queued
    pub fn enqueue(&mut self, key: EmissionKey) {
        if self.by_key.contains_key(&key) || !self.queued.insert(key) {
            return;
        }
        self.pending.push_back(key);
    }

    /// Pop the next pending key
    pub fn pop_pending(&mut self) -> Option<EmissionKey> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        Some(key)
    }

    /// Store an emitted fragment; the first emission of a key wins
    pub fn insert(&mut self, fragment: Fragment) {
        if self.by_key.contains_key(&fragment.key) {
            return;
        }

        self.by_key.insert(fragment.key, self.fragments.len());
        self.fragments.push(fragment);
    }

    /// All fragments in emission order
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// Render the accumulated fragments into compilation units.
    ///
    /// Grouping only: single-file mode concatenates everything into one
    /// unit named after the namespace, the default mode produces one unit
    /// per top level entity. Content is identical either way.
    #[must_use]
    pub fn files(&self, options: &GeneratorOptions) -> Vec<SourceFile> {
        if options.emit_single_file {
            let contents = self
                .fragments
                .iter()
                .map(|fragment| fragment.source.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            if contents.is_empty() {
                return Vec::new();
            }

            return vec![SourceFile {
                path: format!("{}.rs", options.namespace),
                contents,
            }];
        }

        let mut order: Vec<String> = Vec::new();
        let mut grouped: FxHashMap<String, Vec<&str>> = FxHashMap::default();
        for fragment in &self.fragments {
            if !grouped.contains_key(&fragment.path) {
                order.push(fragment.path.clone());
            }
            grouped
                .entry(fragment.path.clone())
                .or_default()
                .push(fragment.source.as_str());
        }

        order
            .into_iter()
            .map(|path| {
                let contents = grouped[&path].join("\n");
                SourceFile { path, contents }
            })
            .collect()
    }
}
