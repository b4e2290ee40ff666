//! Infrastructure layer - Lease store adapters

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryLeaseStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLeaseStore;
