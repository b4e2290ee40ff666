//! In-memory lease store
//!
//! Process-local storage for tests and single-node deployments.
//! Thread-safe via `parking_lot::RwLock`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{check_replace, LeaseRecord, LeaseStore};
use crate::Result;

/// In-memory `LeaseStore`
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeaseStore {
    leases: Arc<RwLock<BTreeMap<String, LeaseRecord>>>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leases
    pub fn len(&self) -> usize {
        self.leases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.read().is_empty()
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn list_leases(&self) -> Result<Vec<LeaseRecord>> {
        Ok(self.leases.read().values().cloned().collect())
    }

    async fn get_lease(&self, lease_id: &str) -> Result<Option<LeaseRecord>> {
        Ok(self.leases.read().get(lease_id).cloned())
    }

    async fn insert_lease(&self, record: &LeaseRecord) -> Result<()> {
        self.leases
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn replace_lease(&self, expected_version: i64, record: &LeaseRecord) -> Result<()> {
        let mut leases = self.leases.write();
        check_replace(leases.get(&record.id), expected_version, record)?;
        leases.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_lease(&self, lease_id: &str) -> Result<bool> {
        Ok(self.leases.write().remove(lease_id).is_some())
    }
}
