//! Index definitions and the generations built from them

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::generation::{Generation, GenerationId, IndexKind};
use crate::features::status::IndexStatus;
use crate::shared::models::{IndexSyncError, ObjectId, Result};

/// Definition version used when the user never set one
pub const DEFAULT_DEFINITION_VERSION: u64 = 0;

/// View an index is defined against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: String,
}

/// User-supplied index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub index_id: ObjectId,
    pub name: String,
    pub database: String,
    pub collection_uuid: Uuid,
    pub last_observed_collection_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewDefinition>,
    pub kind: IndexKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_version: Option<u64>,
    #[serde(default)]
    pub mappings: serde_json::Value,
}

impl IndexDefinition {
    pub fn new(
        index_id: ObjectId,
        name: impl Into<String>,
        database: impl Into<String>,
        collection_uuid: Uuid,
        collection_name: impl Into<String>,
        kind: IndexKind,
    ) -> Self {
        Self {
            index_id,
            name: name.into(),
            database: database.into(),
            collection_uuid,
            last_observed_collection_name: collection_name.into(),
            view: None,
            kind,
            definition_version: None,
            mappings: serde_json::Value::Null,
        }
    }

    pub fn with_view(mut self, view_name: impl Into<String>) -> Self {
        self.view = Some(ViewDefinition {
            name: view_name.into(),
        });
        self
    }

    pub fn with_definition_version(mut self, version: u64) -> Self {
        self.definition_version = Some(version);
        self
    }

    pub fn with_mappings(mut self, mappings: serde_json::Value) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn view_name(&self) -> Option<&str> {
        self.view.as_ref().map(|v| v.name.as_str())
    }

    /// Key of this definition's entry in a lease status map
    pub fn definition_version_key(&self) -> String {
        self.definition_version
            .unwrap_or(DEFAULT_DEFINITION_VERSION)
            .to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Runtime index handles
// ═══════════════════════════════════════════════════════════════════════════

/// Catalog-side handle on an index, independent of whether it is running
pub trait Index: Send + Sync + fmt::Debug {
    fn status(&self) -> IndexStatus;

    fn set_status(&self, status: IndexStatus);

    fn is_closed(&self) -> bool;

    /// Release in-memory resources; data stays on disk
    fn close(&self) -> Result<()>;

    /// Delete the index data; the handle is unusable afterwards
    fn drop_data(&self) -> Result<()>;
}

/// Running instance of one generation, produced by the indexing library
pub trait InitializedIndex: Send + Sync {
    fn generation_id(&self) -> GenerationId;

    fn close(&self) -> Result<()>;
}

/// `Index` that tracks status and lifecycle flags only
#[derive(Debug)]
pub struct TrackedIndex {
    status: RwLock<IndexStatus>,
    closed: AtomicBool,
    dropped: AtomicBool,
}

impl TrackedIndex {
    pub fn new(status: IndexStatus) -> Self {
        Self {
            status: RwLock::new(status),
            closed: AtomicBool::new(false),
            dropped: AtomicBool::new(false),
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }
}

impl Default for TrackedIndex {
    fn default() -> Self {
        Self::new(IndexStatus::not_started())
    }
}

impl Index for TrackedIndex {
    fn status(&self) -> IndexStatus {
        self.status.read().clone()
    }

    fn set_status(&self, status: IndexStatus) {
        *self.status.write() = status;
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn drop_data(&self) -> Result<()> {
        if self.dropped.swap(true, Ordering::AcqRel) {
            return Err(IndexSyncError::catalog("index data already dropped"));
        }
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// IndexGeneration
// ═══════════════════════════════════════════════════════════════════════════

/// A definition bound to one generation and its runtime index
///
/// Immutable; a new definition version yields a new `IndexGeneration`.
#[derive(Debug, Clone)]
pub struct IndexGeneration {
    definition: Arc<IndexDefinition>,
    generation_id: GenerationId,
    index: Arc<dyn Index>,
}

impl IndexGeneration {
    pub fn new(definition: IndexDefinition, generation: Generation, index: Arc<dyn Index>) -> Self {
        let generation_id = GenerationId::new(definition.index_id, generation);
        Self {
            definition: Arc::new(definition),
            generation_id,
            index,
        }
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    pub fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    pub fn generation(&self) -> Generation {
        self.generation_id.generation
    }

    pub fn index_id(&self) -> ObjectId {
        self.definition.index_id
    }

    pub fn index(&self) -> &Arc<dyn Index> {
        &self.index
    }

    pub fn kind(&self) -> IndexKind {
        self.definition.kind
    }

    pub fn unique_string(&self) -> String {
        self.generation_id.unique_string(self.definition.kind)
    }
}

impl fmt::Display for IndexGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_version_key_defaults_to_zero() {
        let def = IndexDefinition::new(
            ObjectId::new(),
            "default",
            "shop",
            Uuid::new_v4(),
            "products",
            IndexKind::Search,
        );
        assert_eq!(def.definition_version_key(), "0");
        assert_eq!(def.with_definition_version(7).definition_version_key(), "7");
    }

    #[test]
    fn test_tracked_index_lifecycle() {
        let index = TrackedIndex::default();
        assert_eq!(index.status(), IndexStatus::not_started());

        index.set_status(IndexStatus::steady());
        assert!(index.status().can_service_queries());

        index.drop_data().unwrap();
        assert!(index.is_closed());
        assert!(index.is_dropped());
        assert!(index.drop_data().is_err());
    }

    #[test]
    fn test_generation_binds_definition_id() {
        let def = IndexDefinition::new(
            ObjectId::new(),
            "vec",
            "shop",
            Uuid::new_v4(),
            "products",
            IndexKind::VectorSearch,
        );
        let id = def.index_id;
        let gen = IndexGeneration::new(def, Generation::CURRENT, Arc::new(TrackedIndex::default()));
        assert_eq!(gen.generation_id().index_id, id);
        assert_eq!(gen.index_id(), id);
        assert!(gen.to_string().starts_with(&id.to_string()));
    }
}
