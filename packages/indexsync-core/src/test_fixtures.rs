//! Shared test doubles

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::SyncSourceConfig;
use crate::features::catalog::{IndexDefinition, IndexGeneration, InitializedIndex, TrackedIndex};
use crate::features::generation::{Generation, GenerationId, IndexKind};
use crate::features::replication::ReplicationManager;
use crate::features::status::IndexStatus;
use crate::shared::models::{ObjectId, Result};
use crate::shared::utils::Teardown;

pub const DATABASE: &str = "app";

pub fn collection_uuid() -> Uuid {
    Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()
}

/// Search index generation over the shared test collection
pub fn search_generation(
    index_id: ObjectId,
    name: &str,
    generation: Generation,
    status: IndexStatus,
) -> IndexGeneration {
    IndexGeneration::new(
        IndexDefinition::new(
            index_id,
            name,
            DATABASE,
            collection_uuid(),
            "articles",
            IndexKind::Search,
        ),
        generation,
        Arc::new(TrackedIndex::new(status)),
    )
}

/// Running instance that remembers being closed
pub struct RunningIndex {
    generation_id: GenerationId,
    closed: AtomicBool,
}

impl RunningIndex {
    pub fn new(generation_id: GenerationId) -> Arc<Self> {
        Arc::new(Self {
            generation_id,
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl InitializedIndex for RunningIndex {
    fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Replication manager that records what it was asked to do
#[derive(Default)]
pub struct RecordingReplication {
    pub added: Mutex<Vec<GenerationId>>,
    pub dropped: Mutex<Vec<GenerationId>>,
}

impl RecordingReplication {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ReplicationManager for RecordingReplication {
    fn add(&self, generation: IndexGeneration) {
        self.added.lock().push(generation.generation_id());
    }

    fn drop_index(&self, generation_id: GenerationId) -> Teardown {
        self.dropped.lock().push(generation_id);
        Teardown::completed()
    }

    fn sync_source_config(&self) -> Option<SyncSourceConfig> {
        None
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn is_replication_supported(&self) -> bool {
        true
    }

    fn shutdown(&self) -> Teardown {
        Teardown::completed()
    }
}
