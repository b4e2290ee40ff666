//! Replication leases
//!
//! A lease is the durable record of one materialized view's replication:
//! the status of every definition version and an opaque checkpoint to resume
//! from after a restart.
//!
//! - `commit_info`: checkpoint encoding and high-water-mark extraction
//! - `lease`: the immutable lease value
//! - `status_resolution`: what to report while two versions are in flight
//! - `lease_manager`: leadership, persistence and version-checked writes

pub mod commit_info;
pub mod lease;
pub mod lease_manager;
pub mod status_resolution;

pub use commit_info::{
    ChangeStreamResumeInfo, EncodedUserData, IndexCommitUserData, InitialSyncResumeInfo,
    ResumeToken, ScanPosition, StaleStateInfo,
};
pub use lease::{IndexDefinitionVersionStatus, Lease, LEASE_FORMAT_VERSION};
pub use lease_manager::{lease_key, LeaseManager, StaticLeaderLeaseManager};
pub use status_resolution::effective_materialized_view_status;
