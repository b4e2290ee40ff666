//! Domain layer for lease persistence
//!
//! # Lease Documents
//!
//! A `LeaseRecord` is the durable form of a replication lease: one record per
//! replicated index, holding the per-definition-version status map and the
//! opaque replication checkpoint (`commit_info`). Records are version-numbered;
//! writers replace a record only when the stored version still matches the
//! version they read (optimistic concurrency).
//!
//! # Port Trait
//!
//! - `LeaseStore`: storage abstraction implemented by the in-memory and SQLite adapters
//!
//! # Examples
//!
//! ```rust,ignore
//! use indexsync_storage::domain::{LeaseRecord, LeaseStore};
//!
//! async fn bump(store: &dyn LeaseStore, id: &str) -> Result<()> {
//!     let current = store.get_lease(id).await?.expect("lease exists");
//!     let mut next = current.clone();
//!     next.lease_version += 1;
//!     next.commit_info = "{...}".to_string();
//!     store.replace_lease(current.lease_version, &next).await?;
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Version number a lease carries before it has ever been written
pub const FIRST_LEASE_VERSION: i64 = 1;

/// Per-definition-version status as persisted
///
/// `status_code` is the upper-snake-case status name (e.g. `"INITIAL_SYNC"`).
/// It is kept as a string here so records written by a newer process with an
/// unknown status still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatusRecord {
    pub queryable: bool,
    pub status_code: String,
}

impl VersionStatusRecord {
    pub fn new(queryable: bool, status_code: impl Into<String>) -> Self {
        Self {
            queryable,
            status_code: status_code.into(),
        }
    }
}

/// Persisted lease document
///
/// Field-for-field image of the in-memory lease value. `commit_info` is an
/// opaque encoded checkpoint; the store never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub lease_version: i64,
    pub collection_uuid: String,
    pub collection_name: String,
    pub owner: String,
    pub last_renewed: DateTime<Utc>,
    pub lease_format_version: i64,
    pub commit_info: String,
    pub latest_index_definition_version: String,
    pub index_definition_version_status_map: BTreeMap<String, VersionStatusRecord>,
}

impl LeaseRecord {
    /// Status of the latest tracked definition version
    pub fn latest_status(&self) -> Option<&VersionStatusRecord> {
        self.index_definition_version_status_map
            .get(&self.latest_index_definition_version)
    }

    /// Whether `self` (the stored record) may be replaced by `update`
    ///
    /// A replace matches when the stored version equals the version the writer
    /// read, or when the stored record already reflects this exact update (a
    /// retry of a write that landed but was never acknowledged).
    pub fn accepts_replace(&self, expected_version: i64, update: &LeaseRecord) -> bool {
        self.lease_version == expected_version
            || (self.lease_version == update.lease_version
                && self.commit_info == update.commit_info)
    }
}

/// Enforce the optimistic-concurrency rule shared by every adapter
pub(crate) fn check_replace(
    stored: Option<&LeaseRecord>,
    expected_version: i64,
    update: &LeaseRecord,
) -> Result<()> {
    match stored {
        None => Err(StorageError::lease_not_found(&update.id)),
        Some(stored) if stored.accepts_replace(expected_version, update) => Ok(()),
        Some(stored) => Err(StorageError::version_conflict(
            &update.id,
            expected_version,
            stored.lease_version,
        )),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Durable lease storage
///
/// # Core Operations
///
/// - `list_leases`: load every lease (process start)
/// - `get_lease`: read one lease by id
/// - `insert_lease`: create or overwrite a lease unconditionally (first write)
/// - `replace_lease`: compare-and-replace on lease version
/// - `delete_lease`: remove a lease
///
/// # Implementations
///
/// - `InMemoryLeaseStore`: process-local, for tests and single-node setups
/// - `SqliteLeaseStore`: file-backed
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// All stored leases, ordered by id
    async fn list_leases(&self) -> Result<Vec<LeaseRecord>>;

    /// Lease by id, `None` if absent
    async fn get_lease(&self, lease_id: &str) -> Result<Option<LeaseRecord>>;

    /// Upsert without a version check
    async fn insert_lease(&self, record: &LeaseRecord) -> Result<()>;

    /// Replace the stored lease if it still carries `expected_version`
    ///
    /// # Errors
    ///
    /// - `LeaseNotFound` if no lease is stored under `record.id`
    /// - `VersionConflict` if another writer got there first
    async fn replace_lease(&self, expected_version: i64, record: &LeaseRecord) -> Result<()>;

    /// Delete a lease; returns whether one existed
    async fn delete_lease(&self, lease_id: &str) -> Result<bool>;
}
