use async_trait::async_trait;
use std::time::Duration;

/// A stored payload and the version it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub version: u64,
    pub payload: String,
}

impl CacheEntry {
    pub fn new(version: u64, payload: impl Into<String>) -> Self {
        Self {
            version,
            payload: payload.into(),
        }
    }
}

/// Cache trait - abstraction over versioned key-value backends (Redis, in-memory).
///
/// Writes are conditional: `insert` only succeeds on an absent key and
/// `replace` only when the stored version matches. Either failure surfaces as
/// [`CacheError::VersionConflict`] so callers can retry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get an entry from the cache.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Create an entry. Fails with `VersionConflict` if the key is present.
    async fn insert(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError>;

    /// Overwrite an entry whose stored version equals `expected_version`.
    async fn replace(
        &self,
        key: &str,
        expected_version: u64,
        entry: CacheEntry,
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Version conflict on key {key}")]
    VersionConflict { key: String },
}
