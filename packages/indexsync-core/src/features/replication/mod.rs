//! Replication management
//!
//! - `ports`: the `ReplicationManager` contract and collaborator traits
//! - `follower`: status mirroring for materialized-view followers
//! - `noop`: nodes without a sync source

pub mod follower;
pub mod noop;
pub mod ports;

pub use follower::MaterializedViewFollowerManager;
pub use noop::NoOpReplicationManager;
pub use ports::{
    BlobstoreSnapshotter, ChangeBatch, ChangeEvent, ChangeOperation, CollectionMetadata,
    IndexFactory, ReplicationManager, ReplicationSource,
};
