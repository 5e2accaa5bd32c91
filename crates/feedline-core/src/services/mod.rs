//! Application services - orchestrate domain operations over the ports.

mod comments;
mod events;
pub mod fanout;
mod feed;
mod feed_heater;
mod moderation;
mod posts;
mod read_cache;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;

use crate::ports::{CommentRepository, PostRepository, ProjectDirectory, TaskPool, UserDirectory};

pub use comments::CommentService;
pub use events::EventPublisher;
pub use feed::{ConsumerError, FeedService, FeedSettings};
pub use feed_heater::{FeedHeater, FeedHeaterSettings, HeatReport};
pub use moderation::{DictionaryError, ModerationDictionary, ModerationSweep, SaveBatch, save_batch};
pub use posts::{PipelinePools, PipelineSettings, PostPipeline};
pub use read_cache::{CacheSettings, CacheWriteError, ReadCache, RetryPolicy};

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub cache: Arc<ReadCache>,
    pub events: EventPublisher,
}

/// Hand `task` to `pool`. A refused task is logged and dropped; the caller's
/// operation has already committed.
pub(crate) async fn submit_background<F>(pool: &dyn TaskPool, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(e) = pool.submit(Box::pin(task)).await {
        tracing::warn!(pool = pool.name(), error = %e, "Background task dropped");
    }
}
