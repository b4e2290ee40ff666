//! Configuration validation

use super::error::{ConfigError, ConfigResult};
use super::io::{DiskMonitorConfig, IndexSyncConfig, ReplicationConfig};

impl IndexSyncConfig {
    /// Check ranges and cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        self.disk_monitor.validate()?;
        self.replication.validate()?;
        if let Some(source) = &self.sync_source {
            if source.mongod_uri.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "sync_source.mongod_uri must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl DiskMonitorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("disk_monitor.pause_threshold", self.pause_threshold),
            ("disk_monitor.resume_threshold", self.resume_threshold),
            ("disk_monitor.crash_threshold", self.crash_threshold),
        ] {
            check_fraction(field, value)?;
        }

        if !(self.resume_threshold < self.pause_threshold
            && self.pause_threshold <= self.crash_threshold)
        {
            return Err(ConfigError::ThresholdOrder {
                resume: self.resume_threshold,
                pause: self.pause_threshold,
                crash: self.crash_threshold,
            });
        }

        check_positive("disk_monitor.poll_interval_ms", self.poll_interval_ms)
    }
}

impl ReplicationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive(
            "replication.status_refresh_interval_ms",
            self.status_refresh_interval_ms,
        )
    }
}

fn check_fraction(field: &str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Range {
            field: field.to_string(),
            value: value.to_string(),
            min: "0.0".to_string(),
            max: "1.0".to_string(),
            hint: "Thresholds are fractions of total disk capacity.".to_string(),
        })
    }
}

fn check_positive(field: &str, value: u64) -> ConfigResult<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::Range {
            field: field.to_string(),
            value: value.to_string(),
            min: "1".to_string(),
            max: u64::MAX.to_string(),
            hint: "Intervals are in milliseconds.".to_string(),
        })
    }
}
