//! Configuration I/O (YAML loading)
//!
//! Schema v1. Every section has defaults, so a minimal file is just
//! `version: 1`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Top-level configuration (YAML schema v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSyncConfig {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Source database connection; absent on nodes that never replicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_source: Option<SyncSourceConfig>,

    #[serde(default)]
    pub lease: LeaseConfig,

    #[serde(default)]
    pub disk_monitor: DiskMonitorConfig,

    #[serde(default)]
    pub replication: ReplicationConfig,
}

/// Source database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSourceConfig {
    pub mongod_uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongos_uri: Option<String>,

    #[serde(default)]
    pub ssl: bool,
}

impl SyncSourceConfig {
    /// Router URI when present, otherwise the direct replica URI
    pub fn connection_uri(&self) -> &str {
        self.mongos_uri.as_deref().unwrap_or(&self.mongod_uri)
    }
}

/// Lease ownership and persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseConfig {
    /// Owner name written into leases this process creates
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Static leadership; fixed for the lifetime of the process
    #[serde(default)]
    pub is_leader: bool,

    /// SQLite lease database; in-memory store when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            is_leader: false,
            store_path: None,
        }
    }
}

fn default_owner() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// Disk pressure handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiskMonitorConfig {
    /// Filesystem holding index data
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Utilization above which replication intake pauses
    #[serde(default = "default_pause_threshold")]
    pub pause_threshold: f64,

    /// Utilization below which paused intake resumes
    #[serde(default = "default_resume_threshold")]
    pub resume_threshold: f64,

    /// Utilization above which the process exits once replication has started
    #[serde(default = "default_crash_threshold")]
    pub crash_threshold: f64,
}

impl DiskMonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DiskMonitorConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            poll_interval_ms: default_poll_interval_ms(),
            pause_threshold: default_pause_threshold(),
            resume_threshold: default_resume_threshold(),
            crash_threshold: default_crash_threshold(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_pause_threshold() -> f64 {
    0.90
}

fn default_resume_threshold() -> f64 {
    0.85
}

fn default_crash_threshold() -> f64 {
    0.95
}

/// Replication manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicationConfig {
    /// How often followers pull materialized-view status from leases
    #[serde(default = "default_status_refresh_interval_ms")]
    pub status_refresh_interval_ms: u64,
}

impl ReplicationConfig {
    pub fn status_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.status_refresh_interval_ms)
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            status_refresh_interval_ms: default_status_refresh_interval_ms(),
        }
    }
}

fn default_status_refresh_interval_ms() -> u64 {
    30_000
}

impl Default for IndexSyncConfig {
    fn default() -> Self {
        Self {
            version: 1,
            sync_source: None,
            lease: LeaseConfig::default(),
            disk_monitor: DiskMonitorConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl IndexSyncConfig {
    /// Load and validate a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: IndexSyncConfig = serde_yaml::from_str(content)?;
        if !SUPPORTED_VERSIONS.contains(&config.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = IndexSyncConfig::from_yaml_str("version: 1\n").unwrap();
        assert!(config.sync_source.is_none());
        assert!(!config.lease.is_leader);
        assert_eq!(config.disk_monitor.poll_interval(), Duration::from_secs(60));
        assert_eq!(
            config.replication.status_refresh_interval(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_yaml_loading() {
        let yaml_content = r#"
version: 1
sync_source:
  mongod_uri: "mongodb://localhost:27017"
  mongos_uri: "mongodb://router:27017"
lease:
  owner: "host-a"
  is_leader: true
disk_monitor:
  data_path: "/var/lib/indexsync"
  poll_interval_ms: 500
  pause_threshold: 0.8
  resume_threshold: 0.7
  crash_threshold: 0.9
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = IndexSyncConfig::from_yaml(temp_file.path()).unwrap();
        let source = config.sync_source.as_ref().unwrap();
        assert_eq!(source.connection_uri(), "mongodb://router:27017");
        assert!(config.lease.is_leader);
        assert_eq!(config.lease.owner, "host-a");
        assert_eq!(config.disk_monitor.pause_threshold, 0.8);
        assert_eq!(config.disk_monitor.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_connection_uri_falls_back_to_mongod() {
        let source = SyncSourceConfig {
            mongod_uri: "mongodb://localhost:27017".to_string(),
            mongos_uri: None,
            ssl: false,
        };
        assert_eq!(source.connection_uri(), "mongodb://localhost:27017");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = IndexSyncConfig::from_yaml_str("version: 1\nleases: {}\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let result = IndexSyncConfig::from_yaml_str("version: 2\n");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = IndexSyncConfig::from_yaml("/nonexistent/indexsync.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = IndexSyncConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        let back = IndexSyncConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
