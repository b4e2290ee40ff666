//! Starting index generations
//!
//! Before a generation runs, its collection must still exist in the source.
//! If a blobstore snapshot is available the data is fetched and attached;
//! otherwise the generation is built from scratch and a snapshot of it is
//! scheduled for other nodes.

use std::sync::Arc;

use tracing::{debug, info};

use super::config_state::ConfigState;
use crate::features::catalog::IndexGeneration;
use crate::features::generation::GenerationId;
use crate::features::replication::{BlobstoreSnapshotter, IndexFactory, ReplicationSource};
use crate::features::status::{IndexStatus, Reason};
use crate::shared::models::Result;
use crate::shared::utils::Teardown;

/// Outcome of `GenerationInitializer::initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// Built from scratch
    Built,
    /// Attached to a downloaded snapshot
    Attached,
    /// Collection is gone; the generation was marked and not started
    CollectionNotFound,
}

/// Turns catalog generations into running instances
pub struct GenerationInitializer {
    state: Arc<ConfigState>,
    factory: Arc<dyn IndexFactory>,
    source: Arc<dyn ReplicationSource>,
    snapshotter: Option<Arc<dyn BlobstoreSnapshotter>>,
}

impl GenerationInitializer {
    pub fn new(
        state: Arc<ConfigState>,
        factory: Arc<dyn IndexFactory>,
        source: Arc<dyn ReplicationSource>,
    ) -> Self {
        Self {
            state,
            factory,
            source,
            snapshotter: None,
        }
    }

    pub fn with_snapshotter(mut self, snapshotter: Arc<dyn BlobstoreSnapshotter>) -> Self {
        self.snapshotter = Some(snapshotter);
        self
    }

    /// Start a generation and register the running instance
    ///
    /// # Panics
    ///
    /// If the generation is already running (see `InitializedIndexCatalog`).
    pub async fn initialize(&self, generation: &IndexGeneration) -> Result<Initialization> {
        let definition = generation.definition();

        let Some(collection) = self
            .source
            .collection_metadata(&definition.database, definition.collection_uuid)
            .await?
        else {
            info!(generation = %generation, "collection not found, not starting index");
            generation
                .index()
                .set_status(IndexStatus::does_not_exist(Reason::CollectionNotFound)?);
            return Ok(Initialization::CollectionNotFound);
        };
        if collection.name != definition.last_observed_collection_name {
            debug!(
                generation = %generation,
                observed = %definition.last_observed_collection_name,
                current = %collection.name,
                "collection was renamed"
            );
        }

        let outcome = match &self.snapshotter {
            Some(snapshotter) if snapshotter.should_download(generation) => {
                snapshotter.download(generation).await?;
                let instance = self.factory.attach(generation).await?;
                self.state.initialized.add_index(instance);
                Initialization::Attached
            }
            _ => {
                let instance = self.factory.build(generation).await?;
                self.state.initialized.add_index(instance);
                if let Some(snapshotter) = &self.snapshotter {
                    snapshotter.schedule_upload(generation);
                }
                Initialization::Built
            }
        };

        debug!(generation = %generation, outcome = ?outcome, "index generation initialized");
        Ok(outcome)
    }

    /// Forget the blobstore snapshots of a dropped generation
    pub fn release(&self, generation_id: GenerationId) -> Teardown {
        match &self.snapshotter {
            Some(snapshotter) => snapshotter.drop_snapshot(generation_id),
            None => Teardown::completed(),
        }
    }
}
