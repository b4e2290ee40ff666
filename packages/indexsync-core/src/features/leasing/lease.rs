//! Replication lease value
//!
//! A `Lease` is an immutable snapshot. Every change derives a new value;
//! persisting it (with a version check) is the lease manager's job.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexsync_storage::{LeaseRecord, VersionStatusRecord, FIRST_LEASE_VERSION};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::commit_info::{
    EncodedUserData, IndexCommitUserData, InitialSyncResumeInfo, ScanPosition,
};
use crate::features::generation::IndexFormatVersion;
use crate::features::status::{IndexStatus, StatusCode};
use crate::shared::models::{IndexSyncError, OpTime, Result};

/// Layout version of the lease document itself
pub const LEASE_FORMAT_VERSION: i64 = 1;

/// Queryability and status of one definition version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinitionVersionStatus {
    pub queryable: bool,
    pub status_code: StatusCode,
}

impl IndexDefinitionVersionStatus {
    /// Status of a version nothing is known about
    pub const UNKNOWN: IndexDefinitionVersionStatus = IndexDefinitionVersionStatus {
        queryable: false,
        status_code: StatusCode::Unknown,
    };

    pub const fn new(queryable: bool, status_code: StatusCode) -> Self {
        Self {
            queryable,
            status_code,
        }
    }

    pub fn from_status(status: &IndexStatus) -> Self {
        Self {
            queryable: status.can_service_queries(),
            status_code: status.status_code,
        }
    }

    fn to_record(self) -> VersionStatusRecord {
        VersionStatusRecord::new(self.queryable, self.status_code.as_str())
    }

    fn from_record(record: &VersionStatusRecord) -> Self {
        let status_code = record.status_code.parse().unwrap_or_else(|_| {
            warn!(status = %record.status_code, "unrecognized lease status code");
            StatusCode::Unknown
        });
        Self::new(record.queryable, status_code)
    }
}

/// Per-collection replication lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub id: String,
    pub lease_version: i64,
    pub collection_uuid: Uuid,
    pub collection_name: String,
    pub owner: String,
    pub last_renewed: DateTime<Utc>,
    pub lease_format_version: i64,
    pub commit_info: EncodedUserData,
    pub latest_index_definition_version: String,
    pub version_statuses: BTreeMap<String, IndexDefinitionVersionStatus>,
}

impl Lease {
    /// Lease for a collection that has never been replicated
    pub fn new_lease(
        id: impl Into<String>,
        collection_uuid: Uuid,
        collection_name: impl Into<String>,
        owner: impl Into<String>,
        definition_version: impl Into<String>,
        status: &IndexStatus,
    ) -> Self {
        let definition_version = definition_version.into();
        let mut version_statuses = BTreeMap::new();
        version_statuses.insert(
            definition_version.clone(),
            IndexDefinitionVersionStatus::from_status(status),
        );
        Self {
            id: id.into(),
            lease_version: FIRST_LEASE_VERSION,
            collection_uuid,
            collection_name: collection_name.into(),
            owner: owner.into(),
            last_renewed: Utc::now(),
            lease_format_version: LEASE_FORMAT_VERSION,
            commit_info: EncodedUserData::EMPTY,
            latest_index_definition_version: definition_version,
            version_statuses,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Latest source time reflected by the steady-state checkpoint, if any
    pub fn extract_high_water_mark(&self) -> Option<OpTime> {
        IndexCommitUserData::from_encoded(&self.commit_info).high_water_mark()
    }

    pub fn status_of(&self, definition_version: &str) -> Option<IndexDefinitionVersionStatus> {
        self.version_statuses.get(definition_version).copied()
    }

    pub fn latest_status(&self) -> IndexDefinitionVersionStatus {
        self.status_of(&self.latest_index_definition_version)
            .unwrap_or(IndexDefinitionVersionStatus::UNKNOWN)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transformations
    // ═══════════════════════════════════════════════════════════════════════

    /// Track a new definition version as the latest
    ///
    /// The new version re-scans the collection from the start but resumes
    /// the change stream from the previous version's high-water-mark, so the
    /// checkpoint becomes an initial-sync position at `MinKey` stamped with
    /// that time. Without a high-water-mark there is nothing to carry over
    /// and the checkpoint is empty.
    pub fn with_new_index_definition_version(
        &self,
        definition_version: impl Into<String>,
        status: &IndexStatus,
    ) -> Lease {
        self.with_version_status(
            definition_version.into(),
            IndexDefinitionVersionStatus::from_status(status),
        )
    }

    /// Carry over definition versions `other` tracks and `self` does not
    ///
    /// Versions are replayed in key order with `other`'s latest applied last,
    /// so the result ends on the same latest version as `other`.
    pub(crate) fn with_versions_added_in(&self, other: &Lease) -> Lease {
        let mut missing: Vec<(&String, &IndexDefinitionVersionStatus)> = other
            .version_statuses
            .iter()
            .filter(|(version, _)| !self.version_statuses.contains_key(*version))
            .collect();
        missing.sort_by_key(|(version, _)| **version == other.latest_index_definition_version);

        missing
            .into_iter()
            .fold(self.clone(), |lease, (version, status)| {
                lease.with_version_status(version.clone(), *status)
            })
    }

    fn with_version_status(
        &self,
        definition_version: String,
        status: IndexDefinitionVersionStatus,
    ) -> Lease {
        let commit_info = match self.extract_high_water_mark() {
            Some(high_water_mark) => IndexCommitUserData::initial_sync_resume(
                InitialSyncResumeInfo {
                    resume_operation_time: high_water_mark,
                    scan_position: ScanPosition::MinKey,
                },
                IndexFormatVersion::CURRENT,
            )
            .to_encoded(),
            None => EncodedUserData::EMPTY,
        };

        let mut version_statuses = self.version_statuses.clone();
        version_statuses.insert(definition_version.clone(), status);

        Lease {
            commit_info,
            latest_index_definition_version: definition_version,
            version_statuses,
            ..self.clone()
        }
    }

    /// Record replication progress
    pub fn with_updated_checkpoint(&self, commit_info: EncodedUserData) -> Lease {
        Lease {
            lease_version: self.lease_version + 1,
            last_renewed: Utc::now(),
            commit_info,
            ..self.clone()
        }
    }

    /// Record the status of one definition version
    pub fn with_updated_status(&self, status: &IndexStatus, definition_version: u64) -> Lease {
        let mut version_statuses = self.version_statuses.clone();
        version_statuses.insert(
            definition_version.to_string(),
            IndexDefinitionVersionStatus::from_status(status),
        );
        Lease {
            lease_version: self.lease_version + 1,
            last_renewed: Utc::now(),
            version_statuses,
            ..self.clone()
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Persistence mapping
    // ═══════════════════════════════════════════════════════════════════════

    pub fn to_record(&self) -> LeaseRecord {
        LeaseRecord {
            id: self.id.clone(),
            lease_version: self.lease_version,
            collection_uuid: self.collection_uuid.to_string(),
            collection_name: self.collection_name.clone(),
            owner: self.owner.clone(),
            last_renewed: self.last_renewed,
            lease_format_version: self.lease_format_version,
            commit_info: self.commit_info.as_str().to_string(),
            latest_index_definition_version: self.latest_index_definition_version.clone(),
            index_definition_version_status_map: self
                .version_statuses
                .iter()
                .map(|(k, v)| (k.clone(), v.to_record()))
                .collect(),
        }
    }

    pub fn from_record(record: &LeaseRecord) -> Result<Lease> {
        let collection_uuid = Uuid::parse_str(&record.collection_uuid).map_err(|e| {
            IndexSyncError::decode(format!(
                "lease {} has invalid collection uuid '{}'",
                record.id, record.collection_uuid
            ))
            .with_source(e)
        })?;

        Ok(Lease {
            id: record.id.clone(),
            lease_version: record.lease_version,
            collection_uuid,
            collection_name: record.collection_name.clone(),
            owner: record.owner.clone(),
            last_renewed: record.last_renewed,
            lease_format_version: record.lease_format_version,
            commit_info: EncodedUserData::from_string(record.commit_info.clone()),
            latest_index_definition_version: record.latest_index_definition_version.clone(),
            version_statuses: record
                .index_definition_version_status_map
                .iter()
                .map(|(k, v)| (k.clone(), IndexDefinitionVersionStatus::from_record(v)))
                .collect(),
        })
    }
}
