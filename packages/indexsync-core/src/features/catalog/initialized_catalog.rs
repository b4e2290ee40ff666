//! Initialized-Index Registry
//!
//! Maps a `GenerationId` to the running instance of that generation.
//! Several build pipelines may finish at once, so the map is a `DashMap`
//! and insertion goes through the entry API (insert-if-absent, no external
//! lock).

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::definition::InitializedIndex;
use crate::features::generation::GenerationId;

/// Running index instances, at most one per generation
#[derive(Default)]
pub struct InitializedIndexCatalog {
    indexes: DashMap<GenerationId, Arc<dyn InitializedIndex>>,
}

impl InitializedIndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running instance
    ///
    /// # Panics
    ///
    /// If an instance is already registered for the same generation. Two
    /// live instances of one generation mean an upstream double-attach; the
    /// process must not continue with either.
    pub fn add_index(&self, index: Arc<dyn InitializedIndex>) {
        let generation_id = index.generation_id();
        let inserted = match self.indexes.entry(generation_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(index);
                true
            }
        };
        if !inserted {
            panic!(
                "initialized index already registered for generation {}",
                generation_id
            );
        }
        debug!(generation = %generation_id, "initialized index registered");
    }

    pub fn remove_index(&self, generation_id: &GenerationId) -> Option<Arc<dyn InitializedIndex>> {
        self.indexes.remove(generation_id).map(|(_, index)| index)
    }

    pub fn get_index(&self, generation_id: &GenerationId) -> Option<Arc<dyn InitializedIndex>> {
        self.indexes.get(generation_id).map(|e| Arc::clone(e.value()))
    }

    pub fn get_size(&self) -> usize {
        self.indexes.len()
    }

    /// Generation ids currently running
    pub fn generation_ids(&self) -> Vec<GenerationId> {
        self.indexes.iter().map(|e| *e.key()).collect()
    }
}
