//! In-memory cache implementation - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use feedline_core::ports::{Cache, CacheEntry, CacheError};

struct StoredEntry {
    entry: CacheEntry,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Expired entries are swept from the whole map once every this many writes.
const SWEEP_EVERY: usize = 1_024;

/// In-memory versioned cache using a HashMap behind an async RwLock.
///
/// Version checks and writes happen under one write guard, so `insert` and
/// `replace` are atomic with respect to each other. Expired keys are dropped
/// when read or during the periodic sweep, so keys that are never read again
/// stay at most `SWEEP_EVERY` writes past their expiry.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryCache {
    store: RwLock<HashMap<String, StoredEntry>>,
    writes: AtomicUsize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_if_due(&self, store: &mut HashMap<String, StoredEntry>) {
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY != 0 {
            return;
        }
        let before = store.len();
        store.retain(|_, stored| !stored.is_expired());
        tracing::debug!(removed = before - store.len(), "Swept expired cache entries");
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let store = self.store.read().await;
        let Some(stored) = store.get(key) else {
            return Ok(None);
        };

        if stored.is_expired() {
            drop(store);
            let mut store = self.store.write().await;
            if store.get(key).is_some_and(StoredEntry::is_expired) {
                store.remove(key);
            }
            return Ok(None);
        }

        Ok(Some(stored.entry.clone()))
    }

    async fn insert(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        if store.get(key).is_some_and(|s| !s.is_expired()) {
            return Err(CacheError::VersionConflict { key: key.to_string() });
        }
        self.sweep_if_due(&mut store);

        store.insert(
            key.to_string(),
            StoredEntry {
                entry,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        expected_version: u64,
        entry: CacheEntry,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        let current = store
            .get(key)
            .filter(|s| !s.is_expired())
            .map(|s| s.entry.version);

        if current != Some(expected_version) {
            return Err(CacheError::VersionConflict { key: key.to_string() });
        }
        self.sweep_if_due(&mut store);

        store.insert(
            key.to_string(),
            StoredEntry {
                entry,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
