//! Adding and dropping index generations
//!
//! Every drop path ends the same way: stop replication, close the running
//! instance, drop the index data. Failures along the way are logged at warn
//! and the drop carries on.

use std::sync::Arc;

use tracing::{debug, warn};

use super::config_state::ConfigState;
use crate::features::catalog::IndexGeneration;
use crate::features::generation::GenerationId;
use crate::shared::models::{IndexSyncError, ObjectId, Result};

/// Lifecycle operations over the shared registries
#[derive(Clone)]
pub struct IndexActions {
    state: Arc<ConfigState>,
}

impl IndexActions {
    pub fn new(state: Arc<ConfigState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ConfigState> {
        &self.state
    }

    /// Serve a new index
    ///
    /// # Errors
    ///
    /// `Catalog` if the index is already in the catalog; a new generation of
    /// an existing index goes through `add_staged_index`.
    pub fn add_index(&self, generation: IndexGeneration) -> Result<()> {
        if self.state.catalog.get_index_by_id(&generation.index_id()).is_some() {
            return Err(IndexSyncError::catalog(format!(
                "index {} is already in the catalog",
                generation.index_id()
            ))
            .with_generation(generation.generation_id()));
        }

        debug!(generation = %generation, "adding index to catalog");
        self.state.catalog.add_index(generation.clone());
        self.state.replication.add(generation);
        Ok(())
    }

    /// Build a new generation behind the live one
    ///
    /// # Errors
    ///
    /// `Catalog` if there is no live generation to stage behind.
    pub fn add_staged_index(&self, generation: IndexGeneration) -> Result<()> {
        if self.state.catalog.get_index_by_id(&generation.index_id()).is_none() {
            return Err(IndexSyncError::catalog(format!(
                "index {} has no live generation to stage behind",
                generation.index_id()
            ))
            .with_generation(generation.generation_id()));
        }

        debug!(generation = %generation, "staging index generation");
        self.state.staged.add_index(generation.clone());
        self.state.replication.add(generation);
        Ok(())
    }

    /// Drop the live generation of an index; `None` if there was none
    pub async fn drop_from_catalog(&self, index_id: &ObjectId) -> Option<GenerationId> {
        let generation = self.state.catalog.remove_index(index_id)?;
        let generation_id = generation.generation_id();
        self.drop_generation(generation).await;
        Some(generation_id)
    }

    /// Drop the staged generation of an index; `None` if there was none
    pub async fn drop_from_staged(&self, index_id: &ObjectId) -> Option<GenerationId> {
        let generation = self.state.staged.remove_index(index_id)?;
        let generation_id = generation.generation_id();
        self.drop_generation(generation).await;
        Some(generation_id)
    }

    /// Drop a swapped-out generation; returns whether it was phasing out
    pub async fn drop_phasing_out(&self, generation_id: &GenerationId) -> bool {
        match self.state.phasing_out.remove_index(generation_id) {
            Some(generation) => {
                self.drop_generation(generation).await;
                true
            }
            None => false,
        }
    }

    async fn drop_generation(&self, generation: IndexGeneration) {
        let generation_id = generation.generation_id();

        self.state.replication.drop_index(generation_id).await;

        if let Some(instance) = self.state.initialized.remove_index(&generation_id) {
            if let Err(e) = instance.close() {
                warn!(generation = %generation_id, error = %e, "failed to close index instance");
            }
        }

        let index = generation.index();
        if !index.is_closed() {
            if let Err(e) = index.close() {
                warn!(generation = %generation_id, error = %e, "failed to close index");
            }
        }
        if let Err(e) = index.drop_data() {
            warn!(generation = %generation_id, error = %e, "failed to drop index data");
        }

        debug!(generation = %generation, "index generation dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::TrackedIndex;
    use crate::features::generation::Generation;
    use crate::features::status::IndexStatus;
    use crate::shared::models::ErrorKind;
    use crate::test_fixtures::{search_generation, RecordingReplication, RunningIndex};

    fn actions() -> (IndexActions, Arc<RecordingReplication>) {
        let replication = RecordingReplication::new();
        let state = Arc::new(ConfigState::new(replication.clone()));
        (IndexActions::new(state), replication)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Add
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_add_index_registers_and_replicates() {
        let (actions, replication) = actions();
        let generation = search_generation(
            ObjectId::new(),
            "idx",
            Generation::CURRENT,
            IndexStatus::not_started(),
        );

        actions.add_index(generation.clone()).unwrap();

        assert!(actions
            .state()
            .catalog
            .get_index_by_id(&generation.index_id())
            .is_some());
        assert_eq!(*replication.added.lock(), vec![generation.generation_id()]);
    }

    #[test]
    fn test_add_index_twice_is_rejected() {
        let (actions, replication) = actions();
        let index_id = ObjectId::new();
        let first = search_generation(index_id, "idx", Generation::CURRENT, IndexStatus::steady());
        let second = search_generation(
            index_id,
            "idx",
            Generation::CURRENT.increment_user().unwrap(),
            IndexStatus::not_started(),
        );

        actions.add_index(first).unwrap();
        let err = actions.add_index(second).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Catalog);
        assert_eq!(replication.added.lock().len(), 1);
    }

    #[test]
    fn test_add_staged_requires_live_generation() {
        let (actions, _) = actions();
        let index_id = ObjectId::new();
        let staged = search_generation(
            index_id,
            "idx",
            Generation::CURRENT.increment_user().unwrap(),
            IndexStatus::not_started(),
        );

        assert_eq!(
            actions.add_staged_index(staged.clone()).unwrap_err().kind,
            ErrorKind::Catalog
        );

        actions
            .add_index(search_generation(
                index_id,
                "idx",
                Generation::CURRENT,
                IndexStatus::steady(),
            ))
            .unwrap();
        actions.add_staged_index(staged).unwrap();
        assert_eq!(actions.state().staged.get_size(), 1);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Drop
    // ═══════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn test_drop_from_catalog_tears_everything_down() {
        let (actions, replication) = actions();
        let index = Arc::new(TrackedIndex::new(IndexStatus::steady()));
        let generation = IndexGeneration::new(
            search_generation(ObjectId::new(), "idx", Generation::CURRENT, IndexStatus::steady())
                .definition()
                .clone(),
            Generation::CURRENT,
            index.clone(),
        );
        let running = RunningIndex::new(generation.generation_id());
        actions.add_index(generation.clone()).unwrap();
        actions.state().initialized.add_index(running.clone());

        let dropped = actions.drop_from_catalog(&generation.index_id()).await;

        assert_eq!(dropped, Some(generation.generation_id()));
        assert_eq!(*replication.dropped.lock(), vec![generation.generation_id()]);
        assert!(running.is_closed());
        assert!(index.is_dropped());
        assert_eq!(actions.state().catalog.get_size(), 0);
        assert_eq!(actions.state().initialized.get_size(), 0);
    }

    #[tokio::test]
    async fn test_drop_missing_is_none() {
        let (actions, replication) = actions();
        assert_eq!(actions.drop_from_catalog(&ObjectId::new()).await, None);
        assert_eq!(actions.drop_from_staged(&ObjectId::new()).await, None);
        let generation_id = GenerationId::new(ObjectId::new(), Generation::CURRENT);
        assert!(!actions.drop_phasing_out(&generation_id).await);
        assert!(replication.dropped.lock().is_empty());
    }

    #[tokio::test]
    async fn test_drop_continues_past_index_errors() {
        let (actions, replication) = actions();
        let generation = search_generation(
            ObjectId::new(),
            "idx",
            Generation::CURRENT,
            IndexStatus::steady(),
        );
        // data already dropped once; the second drop fails and is logged
        generation.index().drop_data().unwrap();
        actions.state().phasing_out.add_index(generation.clone());

        assert!(actions.drop_phasing_out(&generation.generation_id()).await);
        assert_eq!(*replication.dropped.lock(), vec![generation.generation_id()]);
        assert_eq!(actions.state().phasing_out.get_size(), 0);
    }
}
