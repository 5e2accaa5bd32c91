//! Feed consumers and feed reads.
//!
//! Every handler is idempotent: events arrive at least once and in no
//! particular order, so replaying one must leave the cache as it was.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::ServiceContext;
use super::read_cache::CacheWriteError;
use crate::domain::{
    CachedFeed, CachedPost, EventAction, FeedEntry, HeatFeedEvent, PostCacheEvent, PostEvent,
    PostViewEvent, channels,
};
use crate::error::{DomainError, RepoError};
use crate::ports::{MessageHandler, PubSub, PubSubError, PubSubMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Maximum entries kept per user feed.
    pub capacity: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Malformed {channel} message: {source}")]
    Decode {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] RepoError),

    #[error(transparent)]
    Cache(#[from] CacheWriteError),
}

#[derive(Clone)]
pub struct FeedService {
    ctx: ServiceContext,
    settings: FeedSettings,
}

impl FeedService {
    pub fn new(ctx: ServiceContext, settings: FeedSettings) -> Self {
        Self { ctx, settings }
    }

    /// Attach the consumers to their channels on `bus`.
    pub async fn subscribe(&self, bus: &dyn PubSub) -> Result<(), PubSubError> {
        bus.subscribe(
            channels::POST_EVENTS,
            consumer(channels::POST_EVENTS, self.clone(), |svc, event: PostEvent| async move {
                svc.handle_post_event(event).await
            }),
        )
        .await?;
        bus.subscribe(
            channels::FEED_HEAT,
            consumer(channels::FEED_HEAT, self.clone(), |svc, event: HeatFeedEvent| async move {
                svc.handle_heat_event(event).await
            }),
        )
        .await?;
        bus.subscribe(
            channels::POST_CACHE,
            consumer(channels::POST_CACHE, self.clone(), |svc, event: PostCacheEvent| async move {
                svc.handle_cache_refresh(event).await
            }),
        )
        .await?;
        bus.subscribe(
            channels::POST_VIEWS,
            consumer(channels::POST_VIEWS, self.clone(), |svc, event: PostViewEvent| async move {
                svc.handle_post_view(event).await
            }),
        )
        .await?;

        tracing::info!("Feed consumers subscribed");
        Ok(())
    }

    pub async fn handle_post_event(&self, event: PostEvent) -> Result<(), ConsumerError> {
        match event.action {
            EventAction::Create => {
                self.ctx.cache.cache_post_if_absent(&event.post).await?;
                let entry = FeedEntry {
                    post_id: event.post_id,
                    published_at: event.published_at,
                };
                for &follower in &event.follower_ids {
                    self.add_to_feed(follower, entry).await?;
                }
            }
            EventAction::Update => {
                self.ctx.cache.refresh_post(&event.post).await?;
            }
            EventAction::Delete => {
                self.ctx.cache.refresh_post(&event.post).await?;
                for &follower in &event.follower_ids {
                    self.remove_from_feed(follower, event.post_id).await?;
                }
            }
        }
        tracing::debug!(post_id = %event.post_id, action = ?event.action, followers = event.follower_ids.len(), "Post event applied");
        Ok(())
    }

    pub async fn handle_heat_event(&self, event: HeatFeedEvent) -> Result<(), ConsumerError> {
        let entry = FeedEntry {
            post_id: event.post_id,
            published_at: event.published_at,
        };
        self.add_to_feed(event.user_id, entry).await
    }

    pub async fn handle_cache_refresh(&self, event: PostCacheEvent) -> Result<(), ConsumerError> {
        match self.ctx.posts.find_by_id(event.post_id).await? {
            Some(post) => {
                self.ctx.cache.update_or_cache_post(&post).await?;
            }
            None => tracing::debug!(post_id = %event.post_id, "Refresh for unknown post ignored"),
        }
        Ok(())
    }

    pub async fn handle_post_view(&self, event: PostViewEvent) -> Result<(), ConsumerError> {
        self.ctx.posts.increment_views(event.post_id).await?;
        Ok(())
    }

    /// Up to `limit` visible posts from the user's cached feed, newest first.
    /// Posts that fell out of the cache are reloaded from the store.
    pub async fn get_feed(&self, user_id: i64, limit: usize) -> Result<Vec<CachedPost>, DomainError> {
        let Some(feed) = self.ctx.cache.find_feed(user_id).await else {
            return Ok(Vec::new());
        };

        let mut posts = Vec::with_capacity(limit.min(feed.entries.len()));
        for entry in feed.entries {
            if posts.len() >= limit {
                break;
            }
            let cached = match self.ctx.cache.find_post(entry.post_id).await {
                Some(cached) => Some(cached),
                None => self.reload(entry.post_id).await?,
            };
            if let Some(post) = cached.filter(CachedPost::is_visible) {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    async fn reload(&self, post_id: Uuid) -> Result<Option<CachedPost>, DomainError> {
        let Some(post) = self.ctx.posts.find_by_id(post_id).await? else {
            return Ok(None);
        };
        match self.ctx.cache.update_or_cache_post(&post).await {
            Ok(cached) => Ok(Some(cached)),
            Err(e) => {
                tracing::warn!(%post_id, error = %e, "Re-caching feed post failed");
                Ok(Some(CachedPost::from_post(&post, 0)))
            }
        }
    }

    async fn add_to_feed(&self, user_id: i64, entry: FeedEntry) -> Result<(), ConsumerError> {
        let capacity = self.settings.capacity;
        self.ctx
            .cache
            .update_with(&CachedFeed::key_for(user_id), |current: Option<CachedFeed>| {
                let mut feed = current.unwrap_or_else(|| CachedFeed::empty(user_id));
                feed.insert(entry, capacity).then_some(feed)
            })
            .await?;
        Ok(())
    }

    async fn remove_from_feed(&self, user_id: i64, post_id: Uuid) -> Result<(), ConsumerError> {
        self.ctx
            .cache
            .update_with(&CachedFeed::key_for(user_id), |current: Option<CachedFeed>| {
                current.and_then(|mut feed| feed.remove(post_id).then_some(feed))
            })
            .await?;
        Ok(())
    }
}

/// Wrap a typed handler as a bus [`MessageHandler`]. Failures are logged.
fn consumer<E, F, Fut>(channel: &'static str, service: FeedService, handle: F) -> MessageHandler
where
    E: DeserializeOwned + Send + 'static,
    F: Fn(FeedService, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ConsumerError>> + Send + 'static,
{
    let handle = Arc::new(handle);
    Box::new(move |message: PubSubMessage| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let service = service.clone();
        let handle = handle.clone();
        Box::pin(async move {
            let result = match serde_json::from_str::<E>(&message.payload) {
                Ok(event) => (*handle)(service, event).await,
                Err(source) => Err(ConsumerError::Decode { channel, source }),
            };
            if let Err(e) = result {
                tracing::error!(channel, error = %e, "Event consumer failed");
            }
        })
    })
}
