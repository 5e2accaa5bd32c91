//! Shared wiring for the service scenarios: in-memory adapters, a bus that
//! records what was published, and a pool that runs tasks inline.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use feedline_core::domain::{DirectoryUser, NewPost, Post, Project};
use feedline_core::ports::{
    MessageHandler, PoolError, PoolStats, PubSub, PubSubError, Task, TaskPool, UserDirectory,
};
use feedline_core::services::{
    CacheSettings, CommentService, EventPublisher, FeedHeater, FeedHeaterSettings, FeedService,
    FeedSettings, ModerationDictionary, ModerationSweep, PipelinePools, PipelineSettings,
    PostPipeline, ReadCache, ServiceContext,
};
use feedline_infra::{
    InMemoryCache, InMemoryCommentRepository, InMemoryDirectory, InMemoryPostRepository,
};

/// Bus that records every published message.
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingBus {
    pub fn messages(&self, channel: &str) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| serde_json::from_str(payload).unwrap())
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl PubSub for RecordingBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }

    async fn subscribe(&self, _channel: &str, _handler: MessageHandler) -> Result<(), PubSubError> {
        Ok(())
    }

    async fn unsubscribe(&self, _channel: &str) -> Result<(), PubSubError> {
        Ok(())
    }
}

/// Runs each task to completion inside `submit`.
pub struct InlinePool;

#[async_trait]
impl TaskPool for InlinePool {
    fn name(&self) -> &str {
        "inline"
    }

    async fn submit(&self, task: Task) -> Result<(), PoolError> {
        task.await;
        Ok(())
    }

    fn stats(&self) -> PoolStats {
        PoolStats::default()
    }
}

pub struct Harness {
    pub posts: Arc<InMemoryPostRepository>,
    pub comments: Arc<InMemoryCommentRepository>,
    pub directory: Arc<InMemoryDirectory>,
    pub cache: Arc<ReadCache>,
    pub bus: Arc<RecordingBus>,
    pub ctx: ServiceContext,
    pub pipeline: PostPipeline,
    pub comment_service: CommentService,
    pub feed: FeedService,
    pub heater: FeedHeater,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(PipelineSettings::default(), FeedSettings::default())
    }

    pub fn with_settings(pipeline: PipelineSettings, feed: FeedSettings) -> Self {
        let posts = Arc::new(InMemoryPostRepository::new());
        let comments = Arc::new(InMemoryCommentRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let cache = Arc::new(ReadCache::new(
            Arc::new(InMemoryCache::new()),
            CacheSettings::default(),
        ));
        let bus = Arc::new(RecordingBus::default());
        let pool: Arc<dyn TaskPool> = Arc::new(InlinePool);

        let ctx = ServiceContext {
            posts: posts.clone(),
            comments: comments.clone(),
            users: directory.clone(),
            projects: directory.clone(),
            cache: cache.clone(),
            events: EventPublisher::new(bus.clone()),
        };

        let dictionary = Arc::new(ModerationDictionary::from_words(["shit", "fuck"]));
        let moderation = Arc::new(ModerationSweep::new(dictionary, pool.clone(), 100));

        let pipeline_service = PostPipeline::new(
            ctx.clone(),
            PipelinePools {
                post_events: pool.clone(),
                post_views: pool.clone(),
            },
            moderation.clone(),
            pipeline,
        );
        let comment_service = CommentService::new(ctx.clone(), pool.clone(), moderation);
        let feed_service = FeedService::new(ctx.clone(), feed);
        let heater = FeedHeater::new(ctx.clone(), pool, FeedHeaterSettings::default());

        Self {
            posts,
            comments,
            directory,
            cache,
            bus,
            ctx,
            pipeline: pipeline_service,
            comment_service,
            feed: feed_service,
            heater,
        }
    }

    /// Register `id` with the given followers, creating follower records too.
    pub async fn author(&self, id: i64, followers: impl IntoIterator<Item = i64>) {
        self.directory
            .put_user(DirectoryUser::new(id, format!("user{id}")))
            .await;
        for follower in followers {
            if self.directory.get_user(follower).await.is_err() {
                self.directory
                    .put_user(DirectoryUser::new(follower, format!("user{follower}")))
                    .await;
            }
            self.directory.follow(follower, id).await;
        }
    }

    pub async fn project(&self, id: i64, owner_id: i64) {
        self.directory
            .put_project(Project {
                id,
                title: format!("project{id}"),
                owner_id,
            })
            .await;
    }

    pub async fn draft(&self, author_id: i64, content: &str) -> Post {
        self.pipeline
            .create_draft(NewPost {
                content: content.to_string(),
                author_id: Some(author_id),
                ..NewPost::default()
            })
            .await
            .unwrap()
    }

    pub async fn published(&self, author_id: i64, content: &str) -> Post {
        let draft = self.draft(author_id, content).await;
        self.pipeline.publish(draft.id).await.unwrap()
    }
}
