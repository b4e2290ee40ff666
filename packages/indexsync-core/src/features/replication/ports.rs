//! Replication contract and the collaborators it is built from
//!
//! The replication engine itself (change-stream consumption, document
//! transformation, embedding calls) lives outside this crate. It plugs in
//! through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::SyncSourceConfig;
use crate::features::catalog::{IndexGeneration, InitializedIndex};
use crate::features::generation::GenerationId;
use crate::features::leasing::ResumeToken;
use crate::shared::models::{OpTime, Result};
use crate::shared::utils::Teardown;

// ═══════════════════════════════════════════════════════════════════════════
// Replication Manager
// ═══════════════════════════════════════════════════════════════════════════

/// Starts and stops replication per index generation
///
/// Teardown operations never fail the caller: errors are logged and the
/// returned future still completes.
pub trait ReplicationManager: Send + Sync {
    /// Begin replicating a generation; adding one twice is a no-op
    fn add(&self, generation: IndexGeneration);

    /// Stop replicating a generation
    fn drop_index(&self, generation_id: GenerationId) -> Teardown;

    /// Source this manager replicates from, if any
    fn sync_source_config(&self) -> Option<SyncSourceConfig>;

    fn is_initialized(&self) -> bool;

    /// Whether this node writes replicated data itself
    fn is_replication_supported(&self) -> bool;

    /// Stop everything; safe to call more than once
    fn shutdown(&self) -> Teardown;
}

// ═══════════════════════════════════════════════════════════════════════════
// Collaborators
// ═══════════════════════════════════════════════════════════════════════════

/// Collection as currently seen in the source database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub database: String,
    pub collection_uuid: Uuid,
    pub name: String,
}

/// Kind of source change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOperation {
    Insert,
    Update,
    Replace,
    Delete,
    /// Collection dropped or renamed; the stream cannot continue
    Invalidate,
}

/// One source change; documents stay opaque here
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub operation: ChangeOperation,
    pub op_time: OpTime,
    pub document_id: serde_json::Value,
}

/// Events plus the token to resume after them
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub events: Vec<ChangeEvent>,
    pub resume_token: ResumeToken,
}

/// Source database reads
#[async_trait]
pub trait ReplicationSource: Send + Sync {
    /// `None` if the collection no longer exists
    async fn collection_metadata(
        &self,
        database: &str,
        collection_uuid: Uuid,
    ) -> Result<Option<CollectionMetadata>>;

    /// Next change events for `namespace`, starting after `resume_after`
    async fn next_batch(
        &self,
        namespace: &str,
        resume_after: Option<&ResumeToken>,
    ) -> Result<ChangeBatch>;
}

/// Creates running index instances
#[async_trait]
pub trait IndexFactory: Send + Sync {
    /// Start a generation with no data on disk
    async fn build(&self, generation: &IndexGeneration) -> Result<Arc<dyn InitializedIndex>>;

    /// Start a generation over data already on disk
    async fn attach(&self, generation: &IndexGeneration) -> Result<Arc<dyn InitializedIndex>>;
}

/// Moves index snapshots to and from a blobstore
#[async_trait]
pub trait BlobstoreSnapshotter: Send + Sync {
    /// Whether a snapshot should be fetched before the generation starts
    fn should_download(&self, generation: &IndexGeneration) -> bool;

    async fn download(&self, generation: &IndexGeneration) -> Result<()>;

    /// Queue an upload of the generation's current data
    fn schedule_upload(&self, generation: &IndexGeneration);

    /// Forget every snapshot of a generation
    fn drop_snapshot(&self, generation_id: GenerationId) -> Teardown;
}
