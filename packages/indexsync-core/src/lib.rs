/*
 * indexsync - Index Generation Catalog and Replication Lease Lifecycle
 *
 * Feature-First Layout:
 * - shared/      : Error type, ObjectId, OpTime, Teardown
 * - config/      : YAML configuration and validation
 * - features/    : generation → status → catalog → leasing → replication
 *                  → lifecycle, plus resource protection and metrics
 *
 * Durable lease storage lives in the indexsync-storage crate.
 */

#![allow(clippy::new_without_default)] // Constructors kept explicit
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Configuration (YAML)
pub mod config;

/// Feature modules
pub mod features;

#[cfg(test)]
pub(crate) mod test_fixtures;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use shared::models::{ErrorKind, IndexSyncError, ObjectId, OpTime, Result};
pub use shared::utils::Teardown;

pub use config::{ConfigError, IndexSyncConfig};

pub use features::catalog::{
    Index, IndexCatalog, IndexDefinition, IndexGeneration, InitializedIndex,
    InitializedIndexCatalog, TrackedIndex,
};
pub use features::generation::{Generation, GenerationId, IndexFormatVersion, IndexKind};
pub use features::leasing::{
    effective_materialized_view_status, EncodedUserData, IndexCommitUserData,
    IndexDefinitionVersionStatus, Lease, LeaseManager, StaticLeaderLeaseManager,
};
pub use features::lifecycle::{
    ConfigState, GenerationInitializer, IndexActions, Initialization, StagedSwapper,
};
pub use features::metrics::IndexSyncMetrics;
pub use features::replication::{
    MaterializedViewFollowerManager, NoOpReplicationManager, ReplicationManager,
};
pub use features::resource::{
    DiskMonitor, FatalSignal, HysteresisGate, ProcessExit, Supervisor, SupervisorHandle,
    ToggleGate,
};
pub use features::status::{IndexStatus, Reason, StatusCode};
