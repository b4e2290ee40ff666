//! Registries shared by the index lifecycle
//!
//! - `catalog`: the generation of each index that serves queries
//! - `staged`: generations building behind a live one, waiting to swap in
//! - `phasing_out`: generations swapped out and waiting to be dropped
//! - `initialized`: everything running, whichever registry it belongs to

use std::sync::Arc;

use dashmap::DashMap;

use crate::features::catalog::{IndexCatalog, IndexGeneration, InitializedIndexCatalog};
use crate::features::generation::GenerationId;
use crate::features::replication::ReplicationManager;

/// Superseded generations keyed by generation id
///
/// Several generations of one index can be phasing out at once, so this is
/// keyed by generation rather than by index.
#[derive(Default)]
pub struct PhasingOutIndexes {
    indexes: DashMap<GenerationId, IndexGeneration>,
}

impl PhasingOutIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_index(&self, generation: IndexGeneration) {
        self.indexes.insert(generation.generation_id(), generation);
    }

    pub fn remove_index(&self, generation_id: &GenerationId) -> Option<IndexGeneration> {
        self.indexes.remove(generation_id).map(|(_, generation)| generation)
    }

    pub fn get_indexes(&self) -> Vec<IndexGeneration> {
        self.indexes.iter().map(|e| e.value().clone()).collect()
    }

    pub fn get_size(&self) -> usize {
        self.indexes.len()
    }
}

/// Every registry plus the replication manager driving them
pub struct ConfigState {
    pub catalog: Arc<IndexCatalog>,
    pub staged: Arc<IndexCatalog>,
    pub phasing_out: Arc<PhasingOutIndexes>,
    pub initialized: Arc<InitializedIndexCatalog>,
    pub replication: Arc<dyn ReplicationManager>,
}

impl ConfigState {
    /// Empty registries around a replication manager
    pub fn new(replication: Arc<dyn ReplicationManager>) -> Self {
        Self {
            catalog: Arc::new(IndexCatalog::new()),
            staged: Arc::new(IndexCatalog::new()),
            phasing_out: Arc::new(PhasingOutIndexes::new()),
            initialized: Arc::new(InitializedIndexCatalog::new()),
            replication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::{IndexDefinition, TrackedIndex};
    use crate::features::generation::{Generation, IndexKind};
    use crate::shared::models::ObjectId;
    use uuid::Uuid;

    #[test]
    fn test_phasing_out_holds_several_generations_of_one_index() {
        let definition = IndexDefinition::new(
            ObjectId::new(),
            "idx",
            "db",
            Uuid::new_v4(),
            "coll",
            IndexKind::Search,
        );
        let first = IndexGeneration::new(
            definition.clone(),
            Generation::CURRENT,
            Arc::new(TrackedIndex::default()),
        );
        let second = IndexGeneration::new(
            definition,
            Generation::CURRENT.increment_user().unwrap(),
            Arc::new(TrackedIndex::default()),
        );

        let phasing_out = PhasingOutIndexes::new();
        phasing_out.add_index(first.clone());
        phasing_out.add_index(second);
        assert_eq!(phasing_out.get_size(), 2);

        let removed = phasing_out.remove_index(&first.generation_id()).unwrap();
        assert_eq!(removed.generation_id(), first.generation_id());
        assert_eq!(phasing_out.get_size(), 1);
    }
}
