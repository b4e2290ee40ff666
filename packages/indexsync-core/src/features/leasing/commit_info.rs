//! Replication checkpoint encoding
//!
//! The checkpoint stored in a lease (`commit_info`) is an `EncodedUserData`
//! string holding a JSON `IndexCommitUserData`. Everything outside this
//! module treats it as opaque, apart from two operations: reading the
//! high-water-mark and rewriting the checkpoint for a new definition version.
//!
//! Decoding never fails outward. Anything that does not parse is treated as
//! "no checkpoint", which sends replication back to a full initial sync
//! instead of resuming from a misread position.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::features::generation::IndexFormatVersion;
use crate::shared::models::OpTime;

// ═══════════════════════════════════════════════════════════════════════════
// EncodedUserData
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque encoded checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedUserData(String);

impl EncodedUserData {
    pub const EMPTY: EncodedUserData = EncodedUserData(String::new());

    pub fn from_string(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EncodedUserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Resume positions
// ═══════════════════════════════════════════════════════════════════════════

/// Change-stream resume token
///
/// Hex string: a `0x82` tag byte, then the big-endian seconds and increment
/// of the cluster time the token was issued at, then stream-specific bytes
/// this crate does not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(String);

impl ResumeToken {
    const TIMESTAMP_TAG: &'static str = "82";

    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// Token positioned at `op_time`
    pub fn at(op_time: OpTime) -> Self {
        Self(format!(
            "{}{:08X}{:08X}0104",
            Self::TIMESTAMP_TAG,
            op_time.seconds,
            op_time.increment
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cluster time the token was issued at
    pub fn op_time(&self) -> Option<OpTime> {
        let data = self.0.strip_prefix(Self::TIMESTAMP_TAG)?;
        let seconds = u32::from_str_radix(data.get(0..8)?, 16).ok()?;
        let increment = u32::from_str_radix(data.get(8..16)?, 16).ok()?;
        Some(OpTime::new(seconds, increment))
    }
}

/// Where steady-state replication resumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStreamResumeInfo {
    /// `database.collection`
    pub namespace: String,
    pub resume_token: ResumeToken,
}

impl ChangeStreamResumeInfo {
    pub fn new(namespace: impl Into<String>, resume_token: ResumeToken) -> Self {
        Self {
            namespace: namespace.into(),
            resume_token,
        }
    }
}

/// Position of the collection scan during initial sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ScanPosition {
    /// Before every document: scan from the beginning
    MinKey,
    /// After the document with this `_id`
    LastScannedId(serde_json::Value),
}

/// Where an interrupted initial sync resumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialSyncResumeInfo {
    /// Change-stream events after this time are replayed once the scan ends
    pub resume_operation_time: OpTime,
    pub scan_position: ScanPosition,
}

/// Why an index went stale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleStateInfo {
    pub message: String,
    pub optime: OpTime,
}

// ═══════════════════════════════════════════════════════════════════════════
// IndexCommitUserData
// ═══════════════════════════════════════════════════════════════════════════

/// Decoded checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexCommitUserData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_stream_resume_info: Option<ChangeStreamResumeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_sync_resume_info: Option<InitialSyncResumeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_index_version: Option<IndexFormatVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceeded_limits_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_state_info: Option<StaleStateInfo>,
}

impl IndexCommitUserData {
    pub const EMPTY: IndexCommitUserData = IndexCommitUserData {
        change_stream_resume_info: None,
        initial_sync_resume_info: None,
        backend_index_version: None,
        exceeded_limits_reason: None,
        stale_state_info: None,
    };

    /// Steady-state checkpoint
    pub fn change_stream_resume(
        info: ChangeStreamResumeInfo,
        format_version: IndexFormatVersion,
    ) -> Self {
        Self {
            change_stream_resume_info: Some(info),
            backend_index_version: Some(format_version),
            ..Self::EMPTY
        }
    }

    /// Initial-sync checkpoint
    pub fn initial_sync_resume(
        info: InitialSyncResumeInfo,
        format_version: IndexFormatVersion,
    ) -> Self {
        Self {
            initial_sync_resume_info: Some(info),
            backend_index_version: Some(format_version),
            ..Self::EMPTY
        }
    }

    /// Decode, treating malformed data as no checkpoint
    pub fn from_encoded(data: &EncodedUserData) -> Self {
        if data.is_empty() {
            return Self::EMPTY;
        }
        match serde_json::from_str(data.as_str()) {
            Ok(decoded) => decoded,
            Err(e) => {
                info!(error = %e, "unreadable commit user data, resyncing from scratch");
                Self::EMPTY
            }
        }
    }

    pub fn to_encoded(&self) -> EncodedUserData {
        if *self == Self::EMPTY {
            return EncodedUserData::EMPTY;
        }
        match serde_json::to_string(self) {
            Ok(json) => EncodedUserData(json),
            Err(e) => {
                error!(error = %e, "failed to encode commit user data");
                EncodedUserData::EMPTY
            }
        }
    }

    /// No resume position and no recorded index version
    pub fn is_empty(&self) -> bool {
        self.change_stream_resume_info.is_none()
            && self.initial_sync_resume_info.is_none()
            && self.backend_index_version.is_none()
    }

    /// Latest source time known to be reflected, steady state only
    pub fn high_water_mark(&self) -> Option<OpTime> {
        self.change_stream_resume_info
            .as_ref()
            .and_then(|info| info.resume_token.op_time())
    }
}
