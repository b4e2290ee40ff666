//! Shared fixtures for adapter tests

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use crate::domain::{LeaseRecord, VersionStatusRecord};

pub(crate) const LEASE_ID: &str = "65a1f0c2e4b0a1b2c3d4e5f6";

pub(crate) fn sample_record(version: i64, commit_info: &str) -> LeaseRecord {
    let mut statuses = BTreeMap::new();
    statuses.insert("1".to_string(), VersionStatusRecord::new(false, "INITIAL_SYNC"));
    LeaseRecord {
        id: LEASE_ID.to_string(),
        lease_version: version,
        collection_uuid: "550e8400-e29b-41d4-a716-446655440000".to_string(),
        collection_name: "movies".to_string(),
        owner: "localhost".to_string(),
        last_renewed: Utc.timestamp_millis_opt(1_733_446_635_661).unwrap(),
        lease_format_version: 1,
        commit_info: commit_info.to_string(),
        latest_index_definition_version: "1".to_string(),
        index_definition_version_status_map: statuses,
    }
}
