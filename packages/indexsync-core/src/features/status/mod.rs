//! Index status model
//!
//! Status codes an index generation moves through, the reasons that may
//! accompany a terminal status, and the predicates callers use to decide
//! whether a generation can answer queries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::models::{IndexSyncError, OpTime, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Status Codes
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Unknown,
    DoesNotExist,
    NotStarted,
    InitialSync,
    Stale,
    RecoveringTransient,
    RecoveringNonTransient,
    Steady,
    Failed,
}

impl StatusCode {
    pub const ALL: [StatusCode; 9] = [
        StatusCode::Unknown,
        StatusCode::DoesNotExist,
        StatusCode::NotStarted,
        StatusCode::InitialSync,
        StatusCode::Stale,
        StatusCode::RecoveringTransient,
        StatusCode::RecoveringNonTransient,
        StatusCode::Steady,
        StatusCode::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::DoesNotExist => "DOES_NOT_EXIST",
            StatusCode::NotStarted => "NOT_STARTED",
            StatusCode::InitialSync => "INITIAL_SYNC",
            StatusCode::Stale => "STALE",
            StatusCode::RecoveringTransient => "RECOVERING_TRANSIENT",
            StatusCode::RecoveringNonTransient => "RECOVERING_NON_TRANSIENT",
            StatusCode::Steady => "STEADY",
            StatusCode::Failed => "FAILED",
        }
    }

    /// Queries may be served from an index in this state
    pub fn can_service_queries(&self) -> bool {
        matches!(
            self,
            StatusCode::Steady
                | StatusCode::RecoveringTransient
                | StatusCode::RecoveringNonTransient
                | StatusCode::Stale
        )
    }

    /// State not yet settled; the index may still become usable
    pub fn is_transient(&self) -> bool {
        matches!(self, StatusCode::Unknown | StatusCode::NotStarted)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusCode {
    type Err = IndexSyncError;

    fn from_str(s: &str) -> Result<Self> {
        StatusCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| IndexSyncError::decode(format!("unknown status code '{}'", s)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Reasons
// ═══════════════════════════════════════════════════════════════════════════

/// Why an index is failed or gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    InitializationFailed,
    InitialSyncReplicationFailed,
    SteadyStateReplicationFailed,
    UserError,
    ExceedMaxLimit,
    CollectionNotFound,
    IndexDropped,
}

impl Reason {
    /// The only status code this reason may accompany
    pub fn status_code(&self) -> StatusCode {
        match self {
            Reason::CollectionNotFound | Reason::IndexDropped => StatusCode::DoesNotExist,
            Reason::InitializationFailed
            | Reason::InitialSyncReplicationFailed
            | Reason::SteadyStateReplicationFailed
            | Reason::UserError
            | Reason::ExceedMaxLimit => StatusCode::Failed,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// IndexStatus
// ═══════════════════════════════════════════════════════════════════════════

/// Externally reported state of one index generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optime: Option<OpTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
}

impl IndexStatus {
    fn of(status_code: StatusCode) -> Self {
        Self {
            status_code,
            message: None,
            optime: None,
            reason: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn unknown() -> Self {
        Self::of(StatusCode::Unknown)
    }

    pub fn not_started() -> Self {
        Self::of(StatusCode::NotStarted)
    }

    pub fn initial_sync() -> Self {
        Self::of(StatusCode::InitialSync)
    }

    pub fn steady() -> Self {
        Self::of(StatusCode::Steady)
    }

    pub fn stale(message: impl Into<String>, optime: OpTime) -> Self {
        let mut status = Self::of(StatusCode::Stale).with_message(message);
        status.optime = Some(optime);
        status
    }

    pub fn recovering_transient(message: impl Into<String>) -> Self {
        Self::of(StatusCode::RecoveringTransient).with_message(message)
    }

    pub fn recovering_non_transient(message: impl Into<String>) -> Self {
        Self::of(StatusCode::RecoveringNonTransient).with_message(message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::of(StatusCode::Failed).with_message(message)
    }

    /// Status carrying a reason; the reason must belong to `status_code`
    pub fn with_reason(
        status_code: StatusCode,
        message: impl Into<String>,
        reason: Reason,
    ) -> Result<Self> {
        if reason.status_code() != status_code {
            return Err(IndexSyncError::internal(format!(
                "reason {:?} is not valid for status {}",
                reason, status_code
            )));
        }
        let mut status = Self::of(status_code).with_message(message);
        status.reason = Some(reason);
        Ok(status)
    }

    pub fn does_not_exist(reason: Reason) -> Result<Self> {
        let message = match reason {
            Reason::CollectionNotFound => "collection not found",
            Reason::IndexDropped => "index dropped",
            _ => "",
        };
        Self::with_reason(StatusCode::DoesNotExist, message, reason)
    }

    /// Lease-level view without message or reason
    pub fn from_code(status_code: StatusCode) -> Self {
        Self::of(status_code)
    }

    pub fn can_service_queries(&self) -> bool {
        self.status_code.can_service_queries()
    }

    /// A failed index can be rebuilt unless the user must fix something first
    pub fn can_be_recovered(&self) -> bool {
        !matches!(
            self.reason,
            Some(Reason::UserError) | Some(Reason::ExceedMaxLimit)
        ) && self.status_code != StatusCode::DoesNotExist
    }

    pub fn is_transient(&self) -> bool {
        self.status_code.is_transient()
    }

    pub fn is_collection_not_found(&self) -> bool {
        self.reason == Some(Reason::CollectionNotFound)
    }

    pub fn is_index_dropped(&self) -> bool {
        self.reason == Some(Reason::IndexDropped)
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}
