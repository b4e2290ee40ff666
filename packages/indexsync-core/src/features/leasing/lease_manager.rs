//! Lease manager
//!
//! Owns the in-memory view of every replication lease this process knows
//! about and writes changes through a `LeaseStore`.
//!
//! # Leadership
//!
//! `StaticLeaderLeaseManager` is told at construction whether it leads. A
//! leader keeps leases in memory and is the only writer. A follower never
//! writes and reads lease state straight from the store.
//!
//! # Persistence
//!
//! A lease created in memory is written on its first update with a plain
//! upsert. Every later write is a compare-and-replace on the lease version,
//! which also accepts a retry of a write that landed but was never
//! acknowledged. A rejected replace means someone else changed the lease and
//! is reported as non-transient; other store failures are transient.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexsync_storage::{LeaseStore, FIRST_LEASE_VERSION};
use tracing::{debug, info, warn};

use super::commit_info::EncodedUserData;
use super::lease::{IndexDefinitionVersionStatus, Lease};
use super::status_resolution::effective_materialized_view_status;
use crate::features::catalog::IndexGeneration;
use crate::features::generation::GenerationId;
use crate::features::status::IndexStatus;
use crate::shared::models::{IndexSyncError, Result};
use crate::shared::utils::Teardown;

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Replication lease bookkeeping for materialized views
#[async_trait]
pub trait LeaseManager: Send + Sync {
    /// Load persisted leases on start
    async fn initialize(&self) -> Result<()>;

    /// Track a generation; creates the lease or adds its definition version
    ///
    /// Memory only. The lease is written on the next update.
    fn add(&self, generation: &IndexGeneration);

    /// Forget the lease of this generation's index
    fn drop_lease(&self, generation_id: GenerationId) -> Teardown;

    fn is_leader(&self, generation_id: GenerationId) -> bool;

    /// Record replication progress
    async fn update_commit_info(
        &self,
        generation_id: GenerationId,
        commit_info: EncodedUserData,
    ) -> Result<()>;

    /// Last recorded replication progress
    async fn get_commit_info(&self, generation_id: GenerationId) -> Result<EncodedUserData>;

    /// Record the status of one definition version
    async fn update_replication_status(
        &self,
        generation_id: GenerationId,
        definition_version: u64,
        status: &IndexStatus,
    ) -> Result<()>;

    /// Status to report for a materialized view generation
    async fn materialized_view_replication_status(&self, generation: &IndexGeneration)
        -> IndexStatus;

    /// Snapshot of the leases held in memory, ordered by id
    fn leases(&self) -> Vec<Lease>;
}

/// One lease per index across all its generations
pub fn lease_key(generation_id: GenerationId) -> String {
    generation_id.index_id.to_hex()
}

// ═══════════════════════════════════════════════════════════════════════════
// Static Leader
// ═══════════════════════════════════════════════════════════════════════════

/// Lease manager whose leadership is fixed for the life of the process
pub struct StaticLeaderLeaseManager {
    hostname: String,
    is_leader: bool,
    leases: Arc<DashMap<String, Lease>>,
    store: Arc<dyn LeaseStore>,
    /// Serializes store writes and leader drops
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl StaticLeaderLeaseManager {
    pub fn new(hostname: impl Into<String>, is_leader: bool, store: Arc<dyn LeaseStore>) -> Self {
        Self {
            hostname: hostname.into(),
            is_leader,
            leases: Arc::new(DashMap::new()),
            store,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Build and load persisted leases
    pub async fn create(
        hostname: impl Into<String>,
        is_leader: bool,
        store: Arc<dyn LeaseStore>,
    ) -> Result<Self> {
        let manager = Self::new(hostname, is_leader, store);
        manager.initialize().await?;
        Ok(manager)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    fn ensure_leader(&self, generation_id: GenerationId) -> Result<()> {
        if self.is_leader {
            Ok(())
        } else {
            Err(IndexSyncError::internal(
                "attempting to update lease state while not being the leader",
            )
            .with_generation(generation_id))
        }
    }

    /// Clone of the in-memory lease; no map guard escapes
    fn current_lease(&self, key: &str, generation_id: GenerationId) -> Result<Lease> {
        self.leases
            .get(key)
            .map(|lease| lease.value().clone())
            .ok_or_else(|| {
                IndexSyncError::internal(format!("lease does not exist for {}", key))
                    .with_generation(generation_id)
            })
    }

    async fn read_from_store(&self, key: &str) -> Result<Option<Lease>> {
        match self.store.get_lease(key).await? {
            Some(record) => Ok(Some(Lease::from_record(&record)?)),
            None => Ok(None),
        }
    }

    async fn persist(&self, key: &str, current: &Lease, updated: Lease) -> Result<()> {
        let record = updated.to_record();

        if current.lease_version == FIRST_LEASE_VERSION {
            self.store.insert_lease(&record).await.map_err(|e| {
                IndexSyncError::lease_transient(format!("failed to create lease {}", key))
                    .with_source(e)
            })?;
        } else {
            match self
                .store
                .replace_lease(current.lease_version, &record)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    warn!(
                        lease_id = %key,
                        local_version = current.lease_version,
                        "lease update rejected by version check"
                    );
                    return Err(IndexSyncError::lease_non_transient(format!(
                        "failed to update lease {}; check the lease store for corrupted records",
                        key
                    ))
                    .with_source(e));
                }
                Err(e) => {
                    return Err(IndexSyncError::lease_transient(format!(
                        "failed to update lease {}",
                        key
                    ))
                    .with_source(e));
                }
            }
        }

        debug!(
            lease_id = %key,
            lease_version = updated.lease_version,
            "lease written"
        );
        self.install(key, current, updated);
        Ok(())
    }

    /// Swap a just-written lease into memory
    ///
    /// `add` does not wait for writes, so the in-memory lease may have gained
    /// definition versions while the store call was pending. Those are
    /// replayed on top of the written value instead of being overwritten.
    fn install(&self, key: &str, current: &Lease, updated: Lease) {
        match self.leases.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let merged = if entry.get() == current {
                    updated
                } else {
                    debug!(lease_id = %key, "lease changed during write, replaying added versions");
                    updated.with_versions_added_in(entry.get())
                };
                entry.insert(merged);
            }
            Entry::Vacant(_) => {
                warn!(lease_id = %key, "lease dropped during write, not reinstalled");
            }
        }
    }
}

#[async_trait]
impl LeaseManager for StaticLeaderLeaseManager {
    async fn initialize(&self) -> Result<()> {
        if !self.is_leader {
            return Ok(());
        }
        let records = self.store.list_leases().await.map_err(|e| {
            IndexSyncError::lease_transient("failed to initialize leases from store").with_source(e)
        })?;
        for record in &records {
            let lease = Lease::from_record(record)?;
            self.leases.insert(lease.id.clone(), lease);
        }
        info!(count = records.len(), "leases loaded");
        Ok(())
    }

    fn add(&self, generation: &IndexGeneration) {
        let definition = generation.definition();
        let version_key = definition.definition_version_key();
        let status = generation.index().status();

        match self.leases.entry(lease_key(generation.generation_id())) {
            Entry::Occupied(mut entry) => {
                if entry.get().status_of(&version_key).is_none() {
                    let updated = entry
                        .get()
                        .with_new_index_definition_version(version_key.clone(), &status);
                    entry.insert(updated);
                    debug!(
                        lease_id = %entry.key(),
                        definition_version = %version_key,
                        "definition version added to lease"
                    );
                }
            }
            Entry::Vacant(entry) => {
                let lease = Lease::new_lease(
                    entry.key().clone(),
                    definition.collection_uuid,
                    definition.last_observed_collection_name.clone(),
                    self.hostname.clone(),
                    version_key,
                    &status,
                );
                debug!(lease_id = %entry.key(), generation = %generation, "lease created");
                entry.insert(lease);
            }
        }
    }

    fn drop_lease(&self, generation_id: GenerationId) -> Teardown {
        let key = lease_key(generation_id);
        if !self.is_leader {
            self.leases.remove(&key);
            return Teardown::completed();
        }

        let store = Arc::clone(&self.store);
        let leases = Arc::clone(&self.leases);
        let write_lock = Arc::clone(&self.write_lock);
        Teardown::swallowing(format!("drop lease {}", key), async move {
            // an in-flight write must land before the delete, or it would recreate the lease
            let _guard = write_lock.lock().await;
            store.delete_lease(&key).await?;
            leases.remove(&key);
            debug!(lease_id = %key, "lease deleted");
            Ok::<(), indexsync_storage::StorageError>(())
        })
    }

    fn is_leader(&self, _generation_id: GenerationId) -> bool {
        self.is_leader
    }

    async fn update_commit_info(
        &self,
        generation_id: GenerationId,
        commit_info: EncodedUserData,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = lease_key(generation_id);
        let current = self.current_lease(&key, generation_id)?;
        self.ensure_leader(generation_id)?;

        let updated = current.with_updated_checkpoint(commit_info);
        self.persist(&key, &current, updated)
            .await
            .map_err(|e| e.with_generation(generation_id))
    }

    async fn get_commit_info(&self, generation_id: GenerationId) -> Result<EncodedUserData> {
        let key = lease_key(generation_id);
        if self.is_leader {
            return Ok(self.current_lease(&key, generation_id)?.commit_info);
        }

        // followers replicate nothing themselves; the store is authoritative
        Ok(self
            .read_from_store(&key)
            .await?
            .map(|lease| lease.commit_info)
            .unwrap_or(EncodedUserData::EMPTY))
    }

    async fn update_replication_status(
        &self,
        generation_id: GenerationId,
        definition_version: u64,
        status: &IndexStatus,
    ) -> Result<()> {
        if !self.is_leader {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let key = lease_key(generation_id);
        let current = self.current_lease(&key, generation_id)?;

        let updated = current.with_updated_status(status, definition_version);
        self.persist(&key, &current, updated)
            .await
            .map_err(|e| e.with_generation(generation_id))
    }

    async fn materialized_view_replication_status(
        &self,
        generation: &IndexGeneration,
    ) -> IndexStatus {
        let key = lease_key(generation.generation_id());
        let version_key = generation.definition().definition_version_key();

        let lease = if self.is_leader {
            self.leases.get(&key).map(|lease| lease.value().clone())
        } else {
            match self.read_from_store(&key).await {
                Ok(lease) => lease,
                Err(e) => {
                    warn!(lease_id = %key, error = %e, "failed to read index status");
                    None
                }
            }
        };

        let (requested, latest) = match lease {
            Some(lease) => {
                let requested = lease.status_of(&version_key).unwrap_or_else(|| {
                    warn!(
                        lease_id = %key,
                        definition_version = %version_key,
                        generation = %generation,
                        "requested definition version not found in lease"
                    );
                    IndexDefinitionVersionStatus::UNKNOWN
                });
                (requested, lease.latest_status())
            }
            None => (
                IndexDefinitionVersionStatus::UNKNOWN,
                IndexDefinitionVersionStatus::UNKNOWN,
            ),
        };

        effective_materialized_view_status(requested, latest)
    }

    fn leases(&self) -> Vec<Lease> {
        let mut leases: Vec<Lease> = self
            .leases
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        leases.sort_by(|a, b| a.id.cmp(&b.id));
        leases
    }
}
