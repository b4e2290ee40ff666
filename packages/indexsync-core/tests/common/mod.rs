//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexsync_core::features::catalog::{IndexDefinition, TrackedIndex};
use indexsync_core::{
    Generation, GenerationId, IndexGeneration, IndexKind, IndexStatus, InitializedIndex, ObjectId,
    Result,
};
use uuid::Uuid;

pub fn collection_uuid() -> Uuid {
    Uuid::parse_str("0b5b3c3e-6f0e-4a51-9b8e-2f6d2f1d9a11").unwrap()
}

pub fn definition(index_id: ObjectId, kind: IndexKind, version: Option<u64>) -> IndexDefinition {
    let definition = IndexDefinition::new(
        index_id,
        "products_embeddings",
        "shop",
        collection_uuid(),
        "products",
        kind,
    );
    match version {
        Some(v) => definition.with_definition_version(v),
        None => definition,
    }
}

/// Generation with a fresh `TrackedIndex`
pub fn generation(
    index_id: ObjectId,
    kind: IndexKind,
    version: Option<u64>,
    generation: Generation,
    status: IndexStatus,
) -> IndexGeneration {
    IndexGeneration::new(
        definition(index_id, kind, version),
        generation,
        Arc::new(TrackedIndex::new(status)),
    )
}

pub struct Running {
    generation_id: GenerationId,
    closed: AtomicBool,
}

impl Running {
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

impl InitializedIndex for Running {
    fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
