//! Application state - shared across all handlers.

use std::sync::Arc;

use anyhow::Context;

use feedline_core::ports::{
    Cache, CommentRepository, PostRepository, ProjectDirectory, PubSub, TaskPool, UserDirectory,
};
use feedline_core::services::{
    CommentService, EventPublisher, FeedHeater, FeedService, ModerationDictionary,
    ModerationSweep, PipelinePools, PostPipeline, ReadCache, ServiceContext,
};
use feedline_infra::{
    BoundedTaskPool, HttpDirectory, InMemoryCache, InMemoryCommentRepository, InMemoryDirectory,
    InMemoryPostRepository, InMemoryPubSub, WorkerPoolConfig,
};

use crate::config::{AppConfig, pools};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PostPipeline,
    pub comments: CommentService,
    pub feed: FeedService,
    pub heater: FeedHeater,
    pub bus: Arc<dyn PubSub>,
    pub pools: Vec<Arc<dyn TaskPool>>,
}

fn pool(name: &str, config: &WorkerPoolConfig) -> Arc<dyn TaskPool> {
    Arc::new(BoundedTaskPool::new(name, config.clone()))
}

impl AppState {
    /// Build the application state, falling back to in-memory adapters for
    /// every external service that is not configured.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let dictionary = ModerationDictionary::load(&config.dictionary_path).with_context(|| {
            format!(
                "moderation dictionary {} could not be loaded",
                config.dictionary_path.display()
            )
        })?;

        let (posts, comments) = Self::stores(config).await;
        let (cache, bus) = Self::cache_and_bus(config).await?;
        let (users, projects) = Self::directory(config)?;

        let ctx = ServiceContext {
            posts,
            comments,
            users,
            projects,
            cache: Arc::new(ReadCache::new(cache, config.cache)),
            events: EventPublisher::new(bus.clone()),
        };

        let post_events = pool(pools::POST_EVENTS, &config.pools.post_events);
        let post_views = pool(pools::POST_VIEWS, &config.pools.post_views);
        let comment_events = pool(pools::COMMENT_EVENTS, &config.pools.comment_events);
        let moderation_pool = pool(pools::MODERATION, &config.pools.moderation);
        let heater_pool = pool(pools::FEED_HEATER, &config.pools.feed_heater);

        let moderation = Arc::new(ModerationSweep::new(
            Arc::new(dictionary),
            moderation_pool.clone(),
            config.moderation_sublist_size,
        ));

        let pipeline = PostPipeline::new(
            ctx.clone(),
            PipelinePools {
                post_events: post_events.clone(),
                post_views: post_views.clone(),
            },
            moderation.clone(),
            config.pipeline,
        );
        let comments = CommentService::new(ctx.clone(), comment_events.clone(), moderation);
        let feed = FeedService::new(ctx.clone(), config.feed);
        let heater = FeedHeater::new(ctx, heater_pool.clone(), config.heater);

        tracing::info!("Application state initialized");

        Ok(Self {
            pipeline,
            comments,
            feed,
            heater,
            bus,
            pools: vec![post_events, post_views, comment_events, moderation_pool, heater_pool],
        })
    }

    #[cfg(feature = "postgres")]
    async fn stores(config: &AppConfig) -> (Arc<dyn PostRepository>, Arc<dyn CommentRepository>) {
        use feedline_infra::database::connect;
        use feedline_infra::{PostgresCommentRepository, PostgresPostRepository};

        match &config.database {
            Some(db) => match connect(db).await {
                Ok(conn) => {
                    let conn = Arc::new(conn);
                    let posts: Arc<dyn PostRepository> =
                        Arc::new(PostgresPostRepository::new(conn.clone()));
                    let comments: Arc<dyn CommentRepository> =
                        Arc::new(PostgresCommentRepository::new(conn));
                    (posts, comments)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database. Using in-memory stores.");
                    Self::memory_stores()
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running with in-memory stores.");
                Self::memory_stores()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn stores(_config: &AppConfig) -> (Arc<dyn PostRepository>, Arc<dyn CommentRepository>) {
        tracing::info!("Running without postgres feature - using in-memory stores");
        Self::memory_stores()
    }

    fn memory_stores() -> (Arc<dyn PostRepository>, Arc<dyn CommentRepository>) {
        let posts: Arc<dyn PostRepository> = Arc::new(InMemoryPostRepository::new());
        let comments: Arc<dyn CommentRepository> = Arc::new(InMemoryCommentRepository::new());
        (posts, comments)
    }

    #[cfg(feature = "redis")]
    async fn cache_and_bus(config: &AppConfig) -> anyhow::Result<(Arc<dyn Cache>, Arc<dyn PubSub>)> {
        use feedline_infra::{RedisCache, RedisPubSub};

        let Some(redis) = &config.redis else {
            tracing::warn!("REDIS_URL not set. Running with in-memory cache and event bus.");
            return Ok(Self::memory_cache_and_bus());
        };

        let connected = async {
            let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(redis.clone()).await?);
            let bus: Arc<dyn PubSub> = Arc::new(RedisPubSub::new(redis.clone()).await?);
            anyhow::Ok((cache, bus))
        }
        .await;

        match connected {
            Ok(adapters) => Ok(adapters),
            Err(e) if redis.fallback_to_memory => {
                tracing::warn!(error = %e, "Redis unavailable. Falling back to in-memory cache and event bus.");
                Ok(Self::memory_cache_and_bus())
            }
            Err(e) => Err(e.context("Redis unavailable")),
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn cache_and_bus(_config: &AppConfig) -> anyhow::Result<(Arc<dyn Cache>, Arc<dyn PubSub>)> {
        tracing::info!("Running without redis feature - using in-memory cache and event bus");
        Ok(Self::memory_cache_and_bus())
    }

    fn memory_cache_and_bus() -> (Arc<dyn Cache>, Arc<dyn PubSub>) {
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let bus: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::default());
        (cache, bus)
    }

    fn directory(
        config: &AppConfig,
    ) -> anyhow::Result<(Arc<dyn UserDirectory>, Arc<dyn ProjectDirectory>)> {
        match &config.directory {
            Some(directory) => {
                let client = Arc::new(
                    HttpDirectory::new(directory.clone()).context("directory client setup failed")?,
                );
                tracing::info!(
                    users = %directory.user_service_url,
                    projects = %directory.project_service_url,
                    "Directory services configured"
                );
                let users: Arc<dyn UserDirectory> = client.clone();
                let projects: Arc<dyn ProjectDirectory> = client;
                Ok((users, projects))
            }
            None => {
                tracing::warn!("USER_SERVICE_URL not set. Using an empty in-memory directory.");
                let directory = Arc::new(InMemoryDirectory::new());
                let users: Arc<dyn UserDirectory> = directory.clone();
                let projects: Arc<dyn ProjectDirectory> = directory;
                Ok((users, projects))
            }
        }
    }
}
