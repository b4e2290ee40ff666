//! Replication manager for nodes without a sync source

use tracing::debug;

use super::ports::ReplicationManager;
use crate::config::SyncSourceConfig;
use crate::features::catalog::IndexGeneration;
use crate::features::generation::GenerationId;
use crate::shared::utils::Teardown;

/// Accepts every call and does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReplicationManager;

impl NoOpReplicationManager {
    pub fn new() -> Self {
        Self
    }
}

impl ReplicationManager for NoOpReplicationManager {
    fn add(&self, generation: IndexGeneration) {
        debug!(generation = %generation, "no sync source, not replicating");
    }

    fn drop_index(&self, _generation_id: GenerationId) -> Teardown {
        Teardown::completed()
    }

    fn sync_source_config(&self) -> Option<SyncSourceConfig> {
        None
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn is_replication_supported(&self) -> bool {
        false
    }

    fn shutdown(&self) -> Teardown {
        Teardown::completed()
    }
}
