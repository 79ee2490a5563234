//! Copy-on-write working view over an immutable catalog

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::StepCatalog;
use crate::types::StepDescriptor;

/// Patched descriptors keyed by step index
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    patches: BTreeMap<usize, StepDescriptor>,
}

impl PatchSet {
    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.patches.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.patches.contains_key(&index)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.patches.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn clear(&mut self) {
        self.patches.clear();
    }
}

/// The orchestrator's working copy: the builder's catalog plus patches.
/// The catalog itself is never mutated.
#[derive(Debug, Clone)]
pub struct WorkingView {
    catalog: Arc<StepCatalog>,
    patches: PatchSet,
}

impl WorkingView {
    pub fn new(catalog: Arc<StepCatalog>) -> Self {
        Self {
            catalog,
            patches: PatchSet::default(),
        }
    }

    pub fn catalog(&self) -> &Arc<StepCatalog> {
        &self.catalog
    }

    pub fn patches(&self) -> &PatchSet {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Effective descriptor at `index`
    pub fn step(&self, index: usize) -> Option<&StepDescriptor> {
        self.patches
            .get(index)
            .or_else(|| self.catalog.get(index))
    }

    /// Replace the effective descriptor at `index` with `f(current)`.
    /// Returns false when the index is out of range.
    pub fn patch<F>(&mut self, index: usize, f: F) -> bool
    where
        F: FnOnce(&mut StepDescriptor),
    {
        let Some(current) = self.step(index) else {
            return false;
        };
        let mut patched = current.clone();
        f(&mut patched);
        self.patches.patches.insert(index, patched);
        true
    }

    /// Full step list with patches applied, as handed to the renderer
    pub fn compose(&self) -> Vec<StepDescriptor> {
        (0..self.catalog.len())
            .filter_map(|index| self.step(index).cloned())
            .collect()
    }

    pub fn clear_patches(&mut self) {
        self.patches.clear();
    }
}
