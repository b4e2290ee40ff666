//! Process configuration
//!
//! Loaded from a YAML file (`version: 1`), validated on load.

mod error;
mod io;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use io::{
    DiskMonitorConfig, IndexSyncConfig, LeaseConfig, ReplicationConfig, SyncSourceConfig,
    SUPPORTED_VERSIONS,
};
