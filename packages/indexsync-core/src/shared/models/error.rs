//! Error types for the indexsync-core crate
//!
//! Features:
//! - Categorized error kinds (catalog, lease, replication, config, ...)
//! - Transient/non-transient split for lease writes
//! - Optional generation context
//! - Source error chaining

use std::fmt;

use indexsync_storage::StorageError;

/// Error kind categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Catalog bookkeeping errors
    Catalog,
    /// Lease write failed but may succeed on retry (store unavailable, I/O)
    LeaseTransient,
    /// Lease write can never succeed as issued (version conflict, missing lease)
    LeaseNonTransient,
    /// Replication manager errors
    Replication,
    /// Storage errors not tied to a lease write
    Storage,
    /// Configuration errors
    Config,
    /// Checkpoint decode errors
    Decode,
    /// IO errors
    IO,
    /// Internal errors (bugs)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Catalog => "catalog",
            ErrorKind::LeaseTransient => "lease_transient",
            ErrorKind::LeaseNonTransient => "lease_non_transient",
            ErrorKind::Replication => "replication",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
            ErrorKind::Decode => "decode",
            ErrorKind::IO => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Unified error type
#[derive(Debug)]
pub struct IndexSyncError {
    pub kind: ErrorKind,
    pub message: String,
    pub generation: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl IndexSyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            generation: None,
            source: None,
        }
    }

    /// Attach the generation the failure concerns (its unique string or id)
    pub fn with_generation(mut self, generation: impl fmt::Display) -> Self {
        self.generation = Some(generation.to_string());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Catalog, message)
    }

    pub fn lease_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LeaseTransient, message)
    }

    pub fn lease_non_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LeaseNonTransient, message)
    }

    pub fn replication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Replication, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether retrying the failed operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::LeaseTransient | ErrorKind::IO)
    }
}

impl fmt::Display for IndexSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)?;
        if let Some(ref generation) = self.generation {
            write!(f, " (generation {})", generation)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexSyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IndexSyncError>;

// Lease store failures: conflicts can never succeed on retry, everything else might
impl From<StorageError> for IndexSyncError {
    fn from(err: StorageError) -> Self {
        if err.is_conflict() {
            IndexSyncError::lease_non_transient(format!("Lease write rejected: {}", err.message))
                .with_source(err)
        } else {
            IndexSyncError::lease_transient(format!("Lease store error: {}", err.message))
                .with_source(err)
        }
    }
}

impl From<serde_json::Error> for IndexSyncError {
    fn from(err: serde_json::Error) -> Self {
        IndexSyncError::decode(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for IndexSyncError {
    fn from(err: std::io::Error) -> Self {
        IndexSyncError::new(ErrorKind::IO, format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<prometheus::Error> for IndexSyncError {
    fn from(err: prometheus::Error) -> Self {
        IndexSyncError::internal(format!("Metrics registration failed: {}", err))
    }
}
