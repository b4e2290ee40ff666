//! Error types for indexsync-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Database errors (SQLite)
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// No lease stored under the requested id
    LeaseNotFound,
    /// Stored lease version did not match the expected version
    VersionConflict,
    /// Transaction errors
    Transaction,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::LeaseNotFound => "lease_not_found",
            ErrorKind::VersionConflict => "version_conflict",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn lease_not_found(lease_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::LeaseNotFound,
            format!("Lease not found: {}", lease_id.into()),
        )
    }

    pub fn version_conflict(lease_id: &str, expected: i64, found: i64) -> Self {
        Self::new(
            ErrorKind::VersionConflict,
            format!(
                "Lease {} was modified concurrently: expected version {}, found {}",
                lease_id, expected, found
            ),
        )
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    /// True when retrying the same write cannot succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::VersionConflict | ErrorKind::LeaseNotFound)
    }
}

// SQLite error conversions
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

// JSON error conversions
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::new(ErrorKind::IO, format!("I/O error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    // ═══════════════════════════════════════════════════════════════════════
    // Error Construction Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_lease_not_found_display() {
        let err = StorageError::lease_not_found("65a1f0c2e4b0a1b2c3d4e5f6");
        let msg = format!("{}", err);
        assert!(msg.contains("[lease_not_found]"));
        assert!(msg.contains("65a1f0c2e4b0a1b2c3d4e5f6"));
    }

    #[test]
    fn test_version_conflict() {
        let err = StorageError::version_conflict("lease-1", 3, 5);
        assert_eq!(err.kind, ErrorKind::VersionConflict);
        assert!(err.is_conflict());
        assert_eq!(
            format!("{}", err),
            "[version_conflict] Lease lease-1 was modified concurrently: expected version 3, found 5"
        );
    }

    #[test]
    fn test_database_error_is_not_conflict() {
        let err = StorageError::database("Connection failed");
        assert_eq!(err.kind, ErrorKind::Database);
        assert!(!err.is_conflict());
        assert_eq!(format!("{}", err), "[database] Connection failed");
    }

    #[test]
    fn test_with_source() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = StorageError::database("DB file missing").with_source(io_err);

        let source = err.source().unwrap();
        assert!(source.to_string().contains("file not found"));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Conversion Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_from_rusqlite_error() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(err.kind, ErrorKind::Database);
        assert!(err.message.contains("SQLite error"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .err()
            .unwrap();
        let err: StorageError = json_err.into();

        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.message.contains("JSON error"));
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::Database.as_str(), "database");
        assert_eq!(ErrorKind::LeaseNotFound.as_str(), "lease_not_found");
        assert_eq!(ErrorKind::VersionConflict.as_str(), "version_conflict");
        assert_eq!(ErrorKind::IO.as_str(), "io");
    }
}
