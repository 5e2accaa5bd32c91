//! Feed heater: pre-warms every user's feed from their followees' recent posts.
//!
//! The run keeps no checkpoint. Every write it makes is safe to repeat, so
//! an interrupted run is simply started again from the first page.

use std::sync::Arc;

use super::ServiceContext;
use crate::domain::{DirectoryUser, HeatFeedEvent, PageRequest};
use crate::error::DomainError;
use crate::ports::{PoolError, TaskPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedHeaterSettings {
    /// Users fetched per directory page.
    pub users_page_size: u64,
    /// Followee posts considered per user.
    pub posts_limit: u64,
}

impl Default for FeedHeaterSettings {
    fn default() -> Self {
        Self {
            users_page_size: 100,
            posts_limit: 500,
        }
    }
}

/// Counters for one heater run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeatReport {
    pub users: usize,
    pub skipped_users: usize,
    pub posts_cached: usize,
    pub events: usize,
}

#[derive(Clone)]
pub struct FeedHeater {
    ctx: ServiceContext,
    pool: Arc<dyn TaskPool>,
    settings: FeedHeaterSettings,
}

impl FeedHeater {
    pub fn new(ctx: ServiceContext, pool: Arc<dyn TaskPool>, settings: FeedHeaterSettings) -> Self {
        Self { ctx, pool, settings }
    }

    /// Queue a run on the heater pool.
    pub async fn trigger(&self) -> Result<(), PoolError> {
        let this = self.clone();
        self.pool
            .submit(Box::pin(async move {
                if let Err(e) = this.run().await {
                    tracing::error!(error = %e, "Feed heating aborted");
                }
            }))
            .await
    }

    /// Page through the whole user directory and heat each user's feed.
    pub async fn run(&self) -> Result<HeatReport, DomainError> {
        let mut report = HeatReport::default();
        let mut page = 0u64;
        tracing::info!(page_size = self.settings.users_page_size, "Feed heating started");

        loop {
            let request = PageRequest::new(page, self.settings.users_page_size);
            let users = self
                .ctx
                .users
                .list_users(request)
                .await
                .map_err(|e| DomainError::Internal(format!("User directory page {} failed: {}", page, e)))?;

            if users.is_empty() {
                break;
            }
            // Paging metadata comes from a remote service; only a short page ends the run.
            let last_page = (users.content.len() as u64) < request.size;

            for user in &users.content {
                self.heat_user(user, &mut report).await;
            }

            if last_page {
                break;
            }
            page += 1;
        }

        tracing::info!(
            users = report.users,
            skipped = report.skipped_users,
            posts = report.posts_cached,
            events = report.events,
            "Feed heating finished"
        );
        Ok(report)
    }

    async fn heat_user(&self, user: &DirectoryUser, report: &mut HeatReport) {
        report.users += 1;
        if let Err(e) = self.ctx.cache.update_or_cache_user(user).await {
            tracing::error!(user_id = user.id, error = %e, "User cache write failed");
        }

        if user.followee_ids.is_empty() {
            tracing::debug!(user_id = user.id, "No followees, skipping");
            report.skipped_users += 1;
            return;
        }

        let posts = match self
            .ctx
            .posts
            .find_published_by_authors(&user.followee_ids, self.settings.posts_limit)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Followee posts unavailable");
                return;
            }
        };

        for post in &posts {
            match self.ctx.cache.update_or_cache_post(post).await {
                Ok(_) => report.posts_cached += 1,
                Err(e) => tracing::error!(post_id = %post.id, error = %e, "Post cache write failed"),
            }
            let event = HeatFeedEvent {
                user_id: user.id,
                post_id: post.id,
                published_at: post.published_at,
            };
            match self.ctx.events.heat_feed(&event).await {
                Ok(()) => report.events += 1,
                Err(e) => tracing::warn!(user_id = user.id, post_id = %post.id, error = %e, "Heat event not published"),
            }
        }
    }
}
