//! Read cache synchronization.
//!
//! Projections are written with a read-increment-write loop guarded by the
//! stored version. There is no lock: concurrent writers for the same key
//! rely on the conflict/retry cycle, and an exhausted retry budget is an
//! error, never a silently lost update.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{CachedFeed, CachedPost, CachedUser, DirectoryUser, Post, Projection};
use crate::ports::{Cache, CacheEntry, CacheError};

/// Fixed-delay retry budget for conflicting cache writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheWriteError {
    #[error("Cache write for {key} still conflicting after {attempts} attempts")]
    RetriesExhausted { key: String, attempts: u32 },

    #[error("Cache backend failed for {key}: {source}")]
    Backend {
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("Cached value for {key} is unreadable: {message}")]
    Corrupt { key: String, message: String },
}

/// Versioned projections of posts, users and feeds.
pub struct ReadCache {
    cache: Arc<dyn Cache>,
    settings: CacheSettings,
}

impl ReadCache {
    pub fn new(cache: Arc<dyn Cache>, settings: CacheSettings) -> Self {
        Self { cache, settings }
    }

    /// Write a fresh user projection: version 1 if absent, otherwise stored + 1.
    pub async fn update_or_cache_user(&self, user: &DirectoryUser) -> Result<CachedUser, CacheWriteError> {
        let fresh = CachedUser::from_user(user, 0);
        let written = self
            .update_with(&CachedUser::key_for(user.id), |_| Some(fresh.clone()))
            .await?;
        Ok(written.unwrap_or(fresh))
    }

    /// Write a fresh post projection: version 1 if absent, otherwise stored + 1.
    pub async fn update_or_cache_post(&self, post: &Post) -> Result<CachedPost, CacheWriteError> {
        let fresh = CachedPost::from_post(post, 0);
        let written = self
            .update_with(&CachedPost::key_for(post.id), |_| Some(fresh.clone()))
            .await?;
        Ok(written.unwrap_or(fresh))
    }

    /// Like [`ReadCache::update_or_cache_post`], but leaves an identical
    /// projection (and its version) alone and never un-deletes a cached post.
    /// Returns whether a write happened.
    pub async fn refresh_post(&self, post: &Post) -> Result<bool, CacheWriteError> {
        let written = self
            .update_with(&CachedPost::key_for(post.id), |current: Option<CachedPost>| {
                match current {
                    Some(cached) if cached.deleted && !post.deleted => None,
                    Some(cached) if CachedPost::from_post(post, cached.version) == cached => None,
                    _ => Some(CachedPost::from_post(post, 0)),
                }
            })
            .await?;
        Ok(written.is_some())
    }

    /// Cache the post only when no projection exists yet.
    pub async fn cache_post_if_absent(&self, post: &Post) -> Result<bool, CacheWriteError> {
        let written = self
            .update_with(&CachedPost::key_for(post.id), |current: Option<CachedPost>| {
                current.is_none().then(|| CachedPost::from_post(post, 0))
            })
            .await?;
        Ok(written.is_some())
    }

    pub async fn find_user(&self, user_id: i64) -> Option<CachedUser> {
        self.find(&CachedUser::key_for(user_id)).await
    }

    pub async fn find_post(&self, post_id: Uuid) -> Option<CachedPost> {
        self.find(&CachedPost::key_for(post_id)).await
    }

    pub async fn find_feed(&self, user_id: i64) -> Option<CachedFeed> {
        self.find(&CachedFeed::key_for(user_id)).await
    }

    /// Read a projection. Backend and decode failures count as a miss.
    pub async fn find<P: Projection>(&self, key: &str) -> Option<P> {
        match self.cache.get(key).await {
            Ok(Some(entry)) => match decode::<P>(key, &entry) {
                Ok(projection) => Some(projection),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Optimistic read-modify-write of one projection.
    ///
    /// `build` receives the stored projection (if any) and returns the
    /// replacement, or `None` to leave the entry untouched. It may run once per
    /// attempt. Returns the written projection, or `None` if nothing was written.
    pub async fn update_with<P, F>(&self, key: &str, mut build: F) -> Result<Option<P>, CacheWriteError>
    where
        P: Projection,
        F: FnMut(Option<P>) -> Option<P>,
    {
        let RetryPolicy { max_attempts, backoff } = self.settings.retry;
        let attempts = max_attempts.max(1);

        for attempt in 1..=attempts {
            let stored = self.cache.get(key).await.map_err(|source| CacheWriteError::Backend {
                key: key.to_string(),
                source,
            })?;

            let result = match stored {
                Some(entry) => {
                    let current: P = decode(key, &entry)?;
                    let Some(mut next) = build(Some(current)) else {
                        return Ok(None);
                    };
                    let version = entry.version + 1;
                    next.set_version(version);
                    let payload = encode(key, &next)?;
                    self.cache
                        .replace(key, entry.version, CacheEntry::new(version, payload), self.settings.ttl)
                        .await
                        .map(|_| next)
                }
                None => {
                    let Some(mut next) = build(None) else {
                        return Ok(None);
                    };
                    next.set_version(1);
                    let payload = encode(key, &next)?;
                    self.cache
                        .insert(key, CacheEntry::new(1, payload), self.settings.ttl)
                        .await
                        .map(|_| next)
                }
            };

            match result {
                Ok(written) => {
                    tracing::debug!(key, kind = P::KIND, version = written.version(), "Cache projection written");
                    return Ok(Some(written));
                }
                Err(CacheError::VersionConflict { .. }) => {
                    tracing::warn!(key, attempt, max_attempts = attempts, "Cache version conflict");
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(source) => {
                    return Err(CacheWriteError::Backend {
                        key: key.to_string(),
                        source,
                    });
                }
            }
        }

        Err(CacheWriteError::RetriesExhausted {
            key: key.to_string(),
            attempts,
        })
    }
}

fn decode<P: Projection>(key: &str, entry: &CacheEntry) -> Result<P, CacheWriteError> {
    serde_json::from_str(&entry.payload).map_err(|e| CacheWriteError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn encode<P: Projection>(key: &str, projection: &P) -> Result<String, CacheWriteError> {
    serde_json::to_string(projection).map_err(|e| CacheWriteError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}
