//! Error types for mission storage

use mission_types::UserId;
use std::path::PathBuf;

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be encoded
    #[error("failed to encode {table} value: {source}")]
    Encode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Stored document could not be decoded
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Optimistic revision check failed
    #[error("revision conflict for {user}: expected {expected}, found {actual:?}")]
    Conflict {
        user: UserId,
        expected: u64,
        actual: Option<u64>,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the failure is an optimistic-concurrency conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
