//! indexsync-storage - Durable replication lease storage
//!
//! Each replicated index owns one lease document recording which index
//! definition versions replicate against its source collection, their
//! per-version status, and the opaque checkpoint replication resumes from
//! after a restart.
//!
//! ## Concurrency Contract
//!
//! Lease writes are compare-and-replace on `lease_version`. A writer reads a
//! lease at version `n`, derives a new value at `n + 1`, and replaces only if
//! the store still holds `n`. A retry of a write that already landed is
//! accepted when the stored record carries the same version and checkpoint.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use indexsync_storage::{InMemoryLeaseStore, LeaseStore};
//!
//! let store = InMemoryLeaseStore::new();
//! store.insert_lease(&record).await?;
//! store.replace_lease(record.lease_version, &next).await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{LeaseRecord, LeaseStore, VersionStatusRecord, FIRST_LEASE_VERSION};
pub use infrastructure::InMemoryLeaseStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteLeaseStore;
