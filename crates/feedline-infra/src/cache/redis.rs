//! Redis cache implementation with versioned compare-and-set writes.
//!
//! Each key holds a hash `{version, data}`. Inserts and replaces run as Lua
//! scripts so the version check and the write are a single atomic step.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use feedline_core::ports::{Cache, CacheEntry, CacheError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fallback to the in-memory adapters if Redis is unavailable
    pub fallback_to_memory: bool,
    /// Approximate number of entries kept per event stream
    pub stream_max_len: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
            stream_max_len: 100_000,
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.fallback_to_memory),
            stream_max_len: std::env::var("REDIS_STREAM_MAX_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stream_max_len),
        }
    }

    pub(crate) async fn connect(&self) -> Result<(Client, ConnectionManager), String> {
        let client = Client::open(self.url.as_str()).map_err(|e| e.to_string())?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn = tokio::time::timeout(self.connect_timeout, ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| "Connection timed out".to_string())?
            .map_err(|e| e.to_string())?;

        Ok((client, conn))
    }
}

const INSERT_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], 'version', ARGV[1], 'data', ARGV[2])
redis.call('PEXPIRE', KEYS[1], ARGV[3])
return 1
";

const REPLACE_SCRIPT: &str = r"
local current = redis.call('HGET', KEYS[1], 'version')
if not current or tonumber(current) ~= tonumber(ARGV[1]) then
  return 0
end
redis.call('HSET', KEYS[1], 'version', ARGV[2], 'data', ARGV[3])
redis.call('PEXPIRE', KEYS[1], ARGV[4])
return 1
";

/// Redis-backed versioned cache.
///
/// Uses connection manager for automatic reconnection.
pub struct RedisCache {
    conn: ConnectionManager,
    insert: Script,
    replace: Script,
}

impl RedisCache {
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let (_, conn) = config.connect().await.map_err(CacheError::Connection)?;

        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self {
            conn,
            insert: Script::new(INSERT_SCRIPT),
            replace: Script::new(REPLACE_SCRIPT),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, CacheError> {
        Self::new(RedisConfig::from_env()).await
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        (ttl.as_millis() as u64).max(1)
    }
}

fn operation_error(e: redis::RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.conn.clone();
        let (version, data): (Option<u64>, Option<String>) = redis::cmd("HMGET")
            .arg(key)
            .arg("version")
            .arg("data")
            .query_async(&mut conn)
            .await
            .map_err(operation_error)?;

        Ok(match (version, data) {
            (Some(version), Some(payload)) => Some(CacheEntry { version, payload }),
            _ => None,
        })
    }

    async fn insert(&self, key: &str, entry: CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let applied: i64 = self
            .insert
            .key(key)
            .arg(entry.version)
            .arg(entry.payload)
            .arg(Self::ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(operation_error)?;

        if applied == 0 {
            return Err(CacheError::VersionConflict { key: key.to_string() });
        }
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        expected_version: u64,
        entry: CacheEntry,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let applied: i64 = self
            .replace
            .key(key)
            .arg(expected_version)
            .arg(entry.version)
            .arg(entry.payload)
            .arg(Self::ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(operation_error)?;

        if applied == 0 {
            return Err(CacheError::VersionConflict { key: key.to_string() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn get_test_cache() -> Option<RedisCache> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
            ..RedisConfig::default()
        };

        RedisCache::new(config).await.ok()
    }

    fn unique_key(prefix: &str) -> String {
        format!("{prefix}:{}", uuid::Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_redis_cache_compare_and_set() {
        let cache = match get_test_cache().await {
            Some(c) => c,
            None => {
                tracing::warn!("Redis not available, skipping test");
                return;
            }
        };

        let key = unique_key("test_cas");
        let ttl = Duration::from_secs(30);

        cache.insert(&key, CacheEntry::new(1, "one"), ttl).await.unwrap();
        assert!(matches!(
            cache.insert(&key, CacheEntry::new(1, "again"), ttl).await,
            Err(CacheError::VersionConflict { .. })
        ));

        assert!(matches!(
            cache.replace(&key, 5, CacheEntry::new(6, "stale"), ttl).await,
            Err(CacheError::VersionConflict { .. })
        ));

        cache.replace(&key, 1, CacheEntry::new(2, "two"), ttl).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(CacheEntry::new(2, "two")));
    }

    #[tokio::test]
    async fn test_redis_cache_ttl() {
        let cache = match get_test_cache().await {
            Some(c) => c,
            None => return,
        };

        let key = unique_key("test_ttl");

        cache
            .insert(&key, CacheEntry::new(1, "short"), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        // Wait for expiration
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }
}
