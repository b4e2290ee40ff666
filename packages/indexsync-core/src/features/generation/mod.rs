//! Generation identity
//!
//! A `Generation` names one build of an index: the user definition version,
//! the on-disk format version, and the build attempt. A `GenerationId`
//! pins a generation to an index id.
//!
//! ```text
//! user_version    +1 when the user edits the definition
//! format_version  +1 when the on-disk encoding changes
//! attempt         +1 when a build is retried without a definition change
//! ```
//!
//! Ordering is lexicographic on `(user_version, format_version, attempt)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::models::{IndexSyncError, ObjectId, Result};

/// Prefix of materialized-view correlation keys
pub const MATERIALIZED_VIEW_PREFIX: &str = "mv";

// ═══════════════════════════════════════════════════════════════════════════
// Version components
// ═══════════════════════════════════════════════════════════════════════════

/// On-disk index format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexFormatVersion(pub u32);

impl IndexFormatVersion {
    pub const MIN_SUPPORTED: IndexFormatVersion = IndexFormatVersion(5);
    pub const CURRENT: IndexFormatVersion = IndexFormatVersion(6);

    pub fn is_supported(&self) -> bool {
        *self >= Self::MIN_SUPPORTED && *self <= Self::CURRENT
    }
}

impl fmt::Display for IndexFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an index generation materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    Search,
    VectorSearch,
    /// Auto-maintained derived collection; storage layout is shared across
    /// format versions and attempts
    MaterializedView,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Search => "search",
            IndexKind::VectorSearch => "vectorSearch",
            IndexKind::MaterializedView => "materializedView",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Generation
// ═══════════════════════════════════════════════════════════════════════════

/// One build of an index definition
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Generation {
    pub user_version: u32,
    pub format_version: IndexFormatVersion,
    pub attempt: u32,
}

impl Generation {
    pub const FIRST_USER_VERSION: u32 = 0;
    pub const FIRST_ATTEMPT: u32 = 1;

    /// First generation of a newly created index
    pub const CURRENT: Generation = Generation {
        user_version: Self::FIRST_USER_VERSION,
        format_version: IndexFormatVersion::CURRENT,
        attempt: Self::FIRST_ATTEMPT,
    };

    pub const fn new(user_version: u32, format_version: IndexFormatVersion, attempt: u32) -> Self {
        Self {
            user_version,
            format_version,
            attempt,
        }
    }

    /// The user changed the definition
    ///
    /// # Errors
    ///
    /// `Internal` if the user version is already `u32::MAX`.
    pub fn increment_user(&self) -> Result<Generation> {
        let user_version = self.user_version.checked_add(1).ok_or_else(|| {
            IndexSyncError::internal(format!("user version overflow at generation {}", self))
        })?;
        Ok(Generation {
            user_version,
            format_version: self.format_version,
            attempt: Self::FIRST_ATTEMPT,
        })
    }

    /// Retry the build of the same definition
    ///
    /// # Errors
    ///
    /// `Internal` if the attempt counter is already `u32::MAX`.
    pub fn increment_attempt(&self) -> Result<Generation> {
        let attempt = self.attempt.checked_add(1).ok_or_else(|| {
            IndexSyncError::internal(format!("attempt overflow at generation {}", self))
        })?;
        Ok(Generation { attempt, ..*self })
    }

    /// Rebuild the same definition in another on-disk format
    pub fn next_format_version(&self, format_version: IndexFormatVersion) -> Generation {
        Generation {
            user_version: self.user_version,
            format_version,
            attempt: Self::FIRST_ATTEMPT,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "u{}_f{}_a{}",
            self.user_version, self.format_version, self.attempt
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GenerationId
// ═══════════════════════════════════════════════════════════════════════════

/// One build attempt of one index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenerationId {
    pub index_id: ObjectId,
    pub generation: Generation,
}

impl GenerationId {
    pub const fn new(index_id: ObjectId, generation: Generation) -> Self {
        Self {
            index_id,
            generation,
        }
    }

    /// External correlation key for logs and metrics
    ///
    /// Materialized views collapse every format version and attempt of one
    /// user version onto a single key, since they share one storage layout.
    pub fn unique_string(&self, kind: IndexKind) -> String {
        match kind {
            IndexKind::MaterializedView => format!(
                "{}-{}-u{}",
                MATERIALIZED_VIEW_PREFIX, self.index_id, self.generation.user_version
            ),
            IndexKind::Search | IndexKind::VectorSearch => {
                format!("{}_{}", self.index_id, self.generation)
            }
        }
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.index_id, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn index_id() -> ObjectId {
        "65a1f0c2e4b0a1b2c3d4e5f6".parse().unwrap()
    }

    fn gen(u: u32, f: u32, a: u32) -> Generation {
        Generation::new(u, IndexFormatVersion(f), a)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Generation Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_increment_user_resets_attempt() {
        let g = gen(3, 6, 4).increment_user().unwrap();
        assert_eq!(g, gen(4, 6, 1));
    }

    #[test]
    fn test_increment_attempt() {
        assert_eq!(gen(3, 6, 1).increment_attempt().unwrap(), gen(3, 6, 2));
    }

    #[test]
    fn test_increment_overflow_is_error() {
        let err = gen(u32::MAX, 6, 1).increment_user().unwrap_err();
        assert_eq!(err.kind, crate::shared::models::ErrorKind::Internal);
        assert!(gen(0, 6, u32::MAX).increment_attempt().is_err());
        assert_eq!(
            gen(0, 6, u32::MAX).increment_user().unwrap(),
            gen(1, 6, 1)
        );
    }

    #[test]
    fn test_next_format_version() {
        let g = gen(2, 5, 3).next_format_version(IndexFormatVersion::CURRENT);
        assert_eq!(g, gen(2, 6, 1));
    }

    #[test]
    fn test_lexicographic_ordering() {
        assert!(gen(1, 9, 9) < gen(2, 0, 0));
        assert!(gen(1, 5, 9) < gen(1, 6, 0));
        assert!(gen(1, 6, 1) < gen(1, 6, 2));
        assert_eq!(gen(1, 6, 1), gen(1, 6, 1));
        assert_ne!(gen(1, 6, 1), gen(1, 6, 2));
    }

    #[test]
    fn test_current_generation() {
        assert_eq!(Generation::CURRENT.user_version, 0);
        assert_eq!(Generation::CURRENT.attempt, 1);
        assert!(Generation::CURRENT.format_version.is_supported());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unique String Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_search_unique_string_includes_all_components() {
        let id = GenerationId::new(index_id(), gen(123, 1, 1));
        assert_eq!(
            id.unique_string(IndexKind::Search),
            "65a1f0c2e4b0a1b2c3d4e5f6_u123_f1_a1"
        );
    }

    #[test]
    fn test_materialized_view_unique_string_format() {
        let id = GenerationId::new(index_id(), gen(1, 2, 1));
        assert_eq!(
            id.unique_string(IndexKind::MaterializedView),
            "mv-65a1f0c2e4b0a1b2c3d4e5f6-u1"
        );
    }

    #[test]
    fn test_materialized_view_collapses_format_and_attempt() {
        let a = GenerationId::new(index_id(), gen(1, 2, 1));
        let b = GenerationId::new(index_id(), gen(1, 10, 2));
        let c = GenerationId::new(index_id(), gen(10, 2, 1));

        assert_eq!(
            a.unique_string(IndexKind::MaterializedView),
            b.unique_string(IndexKind::MaterializedView)
        );
        assert_ne!(
            a.unique_string(IndexKind::MaterializedView),
            c.unique_string(IndexKind::MaterializedView)
        );
    }

    #[test]
    fn test_materialized_view_one_string_per_user_version() {
        let mut per_user = Vec::new();
        for user in 0..5 {
            let strings: HashSet<String> = (1..8)
                .flat_map(|f| (1..5).map(move |a| gen(user, f, a)))
                .map(|g| GenerationId::new(index_id(), g).unique_string(IndexKind::MaterializedView))
                .collect();
            assert_eq!(strings.len(), 1);
            per_user.extend(strings);
        }
        let distinct: HashSet<_> = per_user.iter().collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_search_unique_string_differs_by_attempt() {
        let a = GenerationId::new(index_id(), gen(1, 6, 1));
        let b = GenerationId::new(index_id(), gen(1, 6, 2));
        assert_ne!(
            a.unique_string(IndexKind::Search),
            b.unique_string(IndexKind::Search)
        );
    }
}
