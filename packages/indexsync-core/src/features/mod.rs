//! Feature modules
//!
//! Leaf-first: generation identity and status are plain values; catalogs
//! and leases build on them; replication, lifecycle and resource protection
//! tie everything to running tasks.

pub mod catalog;
pub mod generation;
pub mod status;

// Durable replication progress
pub mod leasing;

pub mod replication;

// Add / stage / swap / drop
pub mod lifecycle;

// Disk gates, crash valve, supervisor
pub mod resource;

pub mod metrics;
