//! Combining the status of two in-flight definition versions
//!
//! While a new definition version builds, queries keep going to the version
//! they asked for. What a caller sees depends on both that version and the
//! latest one tracked by the lease.

use super::lease::IndexDefinitionVersionStatus;
use crate::features::status::{IndexStatus, StatusCode};

const LATEST_VERSION_FAILED: &str = "latest index definition version failed to build";

const NEW_VERSION_BUILDING: &str =
    "a new index definition version is building; the previous version remains queryable";

/// Status to report for a materialized view at `requested`
///
/// Rules, first match wins:
/// 1. latest is `FAILED` → `FAILED`
/// 2. latest not queryable but requested is → `RECOVERING_TRANSIENT`
/// 3. both queryable and both `STEADY` → `STEADY`
/// 4. otherwise → requested's own status
pub fn effective_materialized_view_status(
    requested: IndexDefinitionVersionStatus,
    latest: IndexDefinitionVersionStatus,
) -> IndexStatus {
    if latest.status_code == StatusCode::Failed {
        return IndexStatus::failed(LATEST_VERSION_FAILED);
    }

    if !latest.queryable && requested.queryable {
        return IndexStatus::recovering_transient(NEW_VERSION_BUILDING);
    }

    if requested.queryable
        && latest.queryable
        && requested.status_code == StatusCode::Steady
        && latest.status_code == StatusCode::Steady
    {
        return IndexStatus::steady();
    }

    IndexStatus::from_code(requested.status_code)
}
