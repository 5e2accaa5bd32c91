//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use feedline_core::services::{
    CacheSettings, FeedHeaterSettings, FeedSettings, PipelineSettings, RetryPolicy,
};
use feedline_infra::{DirectoryConfig, WorkerPoolConfig};

#[cfg(feature = "postgres")]
use feedline_infra::DatabaseConfig;
#[cfg(feature = "redis")]
use feedline_infra::RedisConfig;

use crate::background::SchedulerConfig;
use crate::telemetry::TelemetryConfig;

/// Worker pool names, one per background concern.
pub mod pools {
    pub const POST_EVENTS: &str = "post_events";
    pub const POST_VIEWS: &str = "post_views";
    pub const COMMENT_EVENTS: &str = "comment_events";
    pub const MODERATION: &str = "moderation";
    pub const FEED_HEATER: &str = "feed_heater";
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Word list for the moderation sweep. The server refuses to start without it.
    pub dictionary_path: PathBuf,
    pub moderation_sublist_size: usize,
    pub pipeline: PipelineSettings,
    pub cache: CacheSettings,
    pub feed: FeedSettings,
    pub heater: FeedHeaterSettings,
    pub pools: PoolConfigs,
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
    pub directory: Option<DirectoryConfig>,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
}

#[derive(Debug, Clone)]
pub struct PoolConfigs {
    pub post_events: WorkerPoolConfig,
    pub post_views: WorkerPoolConfig,
    pub comment_events: WorkerPoolConfig,
    pub moderation: WorkerPoolConfig,
    pub feed_heater: WorkerPoolConfig,
}

impl PoolConfigs {
    pub fn from_env() -> Self {
        let small = WorkerPoolConfig {
            workers: 2,
            queue_capacity: 100,
            ..WorkerPoolConfig::default()
        };
        Self {
            post_events: WorkerPoolConfig::from_env(pools::POST_EVENTS, WorkerPoolConfig::default()),
            post_views: WorkerPoolConfig::from_env(pools::POST_VIEWS, WorkerPoolConfig::default()),
            comment_events: WorkerPoolConfig::from_env(
                pools::COMMENT_EVENTS,
                WorkerPoolConfig::default(),
            ),
            moderation: WorkerPoolConfig::from_env(pools::MODERATION, small.clone()),
            feed_heater: WorkerPoolConfig::from_env(pools::FEED_HEATER, small),
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let pipeline_defaults = PipelineSettings::default();
        let cache_defaults = CacheSettings::default();
        let feed_defaults = FeedSettings::default();
        let heater_defaults = FeedHeaterSettings::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            dictionary_path: env::var("MODERATION_DICTIONARY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("resources/profanity-words.txt")),
            moderation_sublist_size: parsed("MODERATION_SUBLIST_SIZE", 100),
            pipeline: PipelineSettings {
                batch_size: parsed("FANOUT_BATCH_SIZE", pipeline_defaults.batch_size),
            },
            cache: CacheSettings {
                ttl: Duration::from_secs(parsed("CACHE_TTL_SECS", cache_defaults.ttl.as_secs())),
                retry: RetryPolicy {
                    max_attempts: parsed("CACHE_RETRY_ATTEMPTS", cache_defaults.retry.max_attempts),
                    backoff: Duration::from_millis(parsed(
                        "CACHE_RETRY_BACKOFF_MS",
                        cache_defaults.retry.backoff.as_millis() as u64,
                    )),
                },
            },
            feed: FeedSettings {
                capacity: parsed("FEED_CAPACITY", feed_defaults.capacity),
            },
            heater: FeedHeaterSettings {
                users_page_size: parsed("FEED_HEATER_USERS_PAGE_SIZE", heater_defaults.users_page_size),
                posts_limit: parsed("FEED_HEATER_POSTS_LIMIT", heater_defaults.posts_limit),
            },
            pools: PoolConfigs::from_env(),
            scheduler: SchedulerConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
            directory: DirectoryConfig::from_env(),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
        }
    }
}
