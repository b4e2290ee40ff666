//! Index Catalog
//!
//! Registry of the current generation of every index, reachable by
//! definition key and by index id. Both maps sit behind one
//! `parking_lot::RwLock`, so a reader never observes one map updated
//! without the other. The lock is task-fair: a steady stream of readers
//! cannot starve a writer. Nothing performs I/O under it.
//!
//! Not-found is an ordinary `None`. A lookup naming the wrong view also
//! returns `None`, indistinguishable from an index that does not exist.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::definition::{IndexDefinition, IndexGeneration};
use crate::shared::models::ObjectId;

/// Definition key: the view is deliberately not part of it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DefinitionKey {
    database: String,
    collection_uuid: Uuid,
    index_name: String,
}

impl DefinitionKey {
    fn of(definition: &IndexDefinition) -> Self {
        Self {
            database: definition.database.clone(),
            collection_uuid: definition.collection_uuid,
            index_name: definition.name.clone(),
        }
    }
}

#[derive(Default)]
struct CatalogMaps {
    by_key: HashMap<DefinitionKey, IndexGeneration>,
    by_id: HashMap<ObjectId, IndexGeneration>,
}

/// Current index generations
#[derive(Default)]
pub struct IndexCatalog {
    maps: RwLock<CatalogMaps>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under both keys; the last write for a key wins
    ///
    /// Cutover code removes the superseded generation first. If it did not,
    /// whatever the new entry displaces under one key is also evicted from
    /// the other map.
    pub fn add_index(&self, generation: IndexGeneration) {
        let key = DefinitionKey::of(generation.definition());
        let id = generation.index_id();

        let mut maps = self.maps.write();

        if let Some(displaced) = maps.by_key.insert(key.clone(), generation.clone()) {
            if displaced.index_id() != id {
                maps.by_id.remove(&displaced.index_id());
            }
        }

        if let Some(displaced) = maps.by_id.insert(id, generation.clone()) {
            let displaced_key = DefinitionKey::of(displaced.definition());
            if displaced_key != key
                && maps
                    .by_key
                    .get(&displaced_key)
                    .is_some_and(|g| g.index_id() == id)
            {
                maps.by_key.remove(&displaced_key);
            }
        }

        debug!(
            index_id = %id,
            generation = %generation,
            size = maps.by_id.len(),
            "catalog entry added"
        );
    }

    /// Lookup by definition key
    ///
    /// When `view_name` is given, the stored generation must be defined on
    /// that view.
    pub fn get_index(
        &self,
        database: &str,
        collection_uuid: Uuid,
        view_name: Option<&str>,
        index_name: &str,
    ) -> Option<IndexGeneration> {
        let key = DefinitionKey {
            database: database.to_string(),
            collection_uuid,
            index_name: index_name.to_string(),
        };
        let maps = self.maps.read();
        let found = maps.by_key.get(&key)?;
        match view_name {
            Some(view) if found.definition().view_name() != Some(view) => None,
            _ => Some(found.clone()),
        }
    }

    pub fn get_index_by_id(&self, index_id: &ObjectId) -> Option<IndexGeneration> {
        self.maps.read().by_id.get(index_id).cloned()
    }

    /// Point-in-time copy of every entry
    pub fn get_indexes(&self) -> Vec<IndexGeneration> {
        self.maps.read().by_id.values().cloned().collect()
    }

    pub fn get_size(&self) -> usize {
        self.maps.read().by_id.len()
    }

    pub fn remove_index(&self, index_id: &ObjectId) -> Option<IndexGeneration> {
        let mut maps = self.maps.write();
        let removed = maps.by_id.remove(index_id)?;

        let key = DefinitionKey::of(removed.definition());
        if maps
            .by_key
            .get(&key)
            .is_some_and(|g| g.index_id() == *index_id)
        {
            maps.by_key.remove(&key);
        }

        debug!(index_id = %index_id, generation = %removed, "catalog entry removed");
        Some(removed)
    }

    /// Both maps hold the same set of generations
    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let maps = self.maps.read();
        maps.by_key.len() == maps.by_id.len()
            && maps.by_key.iter().all(|(key, gen)| {
                maps.by_id
                    .get(&gen.index_id())
                    .is_some_and(|g| DefinitionKey::of(g.definition()) == *key)
            })
    }
}
