//! Post pipeline.
//!
//! Store writes happen inline, inside one transaction per operation. Cache
//! writes and event fan-out run afterwards on the worker pools, so a failure
//! there is logged and never undoes the committed post.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::fanout;
use super::moderation::{ModerationSweep, save_batch};
use super::{ServiceContext, submit_background};
use crate::domain::{
    EventAction, NewPost, Page, PageRequest, Post, PostOwner, PostRevision, normalize_hashtags,
    validate_content,
};
use crate::error::DomainError;
use crate::ports::{DirectoryError, TaskPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum follower ids per post event.
    pub batch_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { batch_size: 1000 }
    }
}

/// Worker pools used by the pipeline.
#[derive(Clone)]
pub struct PipelinePools {
    pub post_events: Arc<dyn TaskPool>,
    pub post_views: Arc<dyn TaskPool>,
}

#[derive(Debug, Clone, Copy)]
enum ListFilter {
    Drafts,
    Published,
    All,
}

impl ListFilter {
    fn keeps(self, post: &Post) -> bool {
        match self {
            Self::Drafts => !post.published && !post.deleted,
            Self::Published => post.is_visible(),
            Self::All => true,
        }
    }
}

#[derive(Clone)]
pub struct PostPipeline {
    ctx: ServiceContext,
    pools: PipelinePools,
    moderation: Arc<ModerationSweep>,
    settings: PipelineSettings,
}

impl PostPipeline {
    pub fn new(
        ctx: ServiceContext,
        pools: PipelinePools,
        moderation: Arc<ModerationSweep>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            ctx,
            pools,
            moderation,
            settings,
        }
    }

    #[tracing::instrument(skip(self, new), fields(author_id = ?new.author_id, project_id = ?new.project_id))]
    pub async fn create_draft(&self, new: NewPost) -> Result<Post, DomainError> {
        validate_content(&new.content)?;
        let owner = PostOwner::from_parts(new.author_id, new.project_id)?;
        self.ensure_owner_exists(owner).await?;

        let post = Post::draft(owner, new.content, new.hashtags, new.scheduled_at);
        let saved = self.ctx.posts.save(post).await?;
        tracing::info!(post_id = %saved.id, "Draft created");
        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    pub async fn publish(&self, post_id: Uuid) -> Result<Post, DomainError> {
        let now = Utc::now();
        let post = self
            .ctx
            .posts
            .with_transaction(post_id, Box::new(move |post: &mut Post| post.publish(now)))
            .await?;

        tracing::info!(post_id = %post.id, "Post published");
        self.announce_published(post.clone()).await;
        Ok(post)
    }

    /// Publish every draft whose schedule has come due. Returns how many were published.
    pub async fn publish_scheduled(&self) -> Result<usize, DomainError> {
        let now = Utc::now();
        let ready = self.ctx.posts.find_ready_to_publish(now).await?;
        let mut published = 0;

        for candidate in ready {
            let result = self
                .ctx
                .posts
                .with_transaction(candidate.id, Box::new(move |post: &mut Post| post.publish_scheduled(now)))
                .await;
            match result {
                Ok(post) => {
                    published += 1;
                    self.announce_published(post).await;
                }
                Err(e) => {
                    tracing::warn!(post_id = %candidate.id, error = %e, "Scheduled publication skipped");
                }
            }
        }

        tracing::info!(published, "Scheduled publication finished");
        Ok(published)
    }

    #[tracing::instrument(skip(self, revision), fields(post_id = %revision.post_id))]
    pub async fn update(&self, caller: i64, revision: PostRevision) -> Result<Post, DomainError> {
        validate_content(&revision.content)?;
        let current = self.load(revision.post_id).await?;
        self.ensure_owned_by(&current, caller).await?;

        let PostRevision {
            post_id,
            content,
            scheduled_at,
        } = revision;
        let now = Utc::now();
        let post = self
            .ctx
            .posts
            .with_transaction(
                post_id,
                Box::new(move |post: &mut Post| {
                    post.revise(content, scheduled_at, now);
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(post_id = %post.id, "Post updated");
        let this = self.clone();
        let updated = post.clone();
        submit_background(self.pools.post_events.as_ref(), async move {
            this.fan_out_updated(updated).await;
        })
        .await;
        Ok(post)
    }

    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, post_id: Uuid) -> Result<Post, DomainError> {
        let now = Utc::now();
        let post = self
            .ctx
            .posts
            .with_transaction(post_id, Box::new(move |post: &mut Post| post.soft_delete(now)))
            .await?;

        tracing::info!(post_id = %post.id, "Post soft-deleted");
        let this = self.clone();
        let deleted = post.clone();
        submit_background(self.pools.post_events.as_ref(), async move {
            let followers = this.author_followers(&deleted).await;
            if deleted.published {
                this.refresh_cached_post(&deleted).await;
            }
            this.emit(EventAction::Delete, &deleted, &followers).await;
        })
        .await;
        Ok(post)
    }

    /// Read a visible post. Counts a view and refreshes the cache in the background.
    pub async fn get_by_id(&self, post_id: Uuid) -> Result<Post, DomainError> {
        let post = self.load(post_id).await?;
        if post.deleted {
            return Err(DomainError::AlreadyDeleted(format!(
                "Post {} has been deleted",
                post_id
            )));
        }
        if !post.published {
            return Err(DomainError::NotPublished(format!(
                "Post {} is not published",
                post_id
            )));
        }
        self.record_views(vec![post.id]).await;
        Ok(post)
    }

    pub async fn list_drafts_by_author(&self, author_id: i64) -> Result<Vec<Post>, DomainError> {
        self.list_by_owner(PostOwner::Author(author_id), ListFilter::Drafts).await
    }

    pub async fn list_drafts_by_project(&self, project_id: i64) -> Result<Vec<Post>, DomainError> {
        self.list_by_owner(PostOwner::Project(project_id), ListFilter::Drafts).await
    }

    pub async fn list_all_by_author(&self, author_id: i64) -> Result<Vec<Post>, DomainError> {
        self.list_by_owner(PostOwner::Author(author_id), ListFilter::All).await
    }

    pub async fn list_all_by_project(&self, project_id: i64) -> Result<Vec<Post>, DomainError> {
        self.list_by_owner(PostOwner::Project(project_id), ListFilter::All).await
    }

    pub async fn list_published_by_author(&self, author_id: i64) -> Result<Vec<Post>, DomainError> {
        self.list_by_owner(PostOwner::Author(author_id), ListFilter::Published).await
    }

    pub async fn list_published_by_project(&self, project_id: i64) -> Result<Vec<Post>, DomainError> {
        self.list_by_owner(PostOwner::Project(project_id), ListFilter::Published).await
    }

    /// Published posts carrying `hashtag`, newest first.
    pub async fn list_by_hashtag(&self, hashtag: &str, page: PageRequest) -> Result<Page<Post>, DomainError> {
        let Some(tag) = normalize_hashtags(vec![hashtag.to_string()]).pop() else {
            return Ok(Page::empty(page));
        };
        let found = self.ctx.posts.find_by_hashtag(&tag, page).await?;
        self.record_views(found.content.iter().map(|p| p.id).collect()).await;
        Ok(found)
    }

    /// Queue every unverified post for moderation. Errors are logged.
    pub async fn do_moderation(&self) {
        let posts = match self.ctx.posts.find_not_verified().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!(error = %e, "Cannot load posts for moderation");
                return;
            }
        };
        let store = self.ctx.posts.clone();
        let save = save_batch(move |batch: Vec<Post>| {
            let store = store.clone();
            async move { store.save_verifications(batch).await }
        });
        self.moderation.submit("post", posts, save).await;
    }

    async fn list_by_owner(&self, owner: PostOwner, filter: ListFilter) -> Result<Vec<Post>, DomainError> {
        self.ensure_owner_exists(owner).await?;
        let posts = match owner {
            PostOwner::Author(id) => self.ctx.posts.find_by_author(id).await?,
            PostOwner::Project(id) => self.ctx.posts.find_by_project(id).await?,
        };

        let mut posts: Vec<Post> = posts.into_iter().filter(|p| filter.keeps(p)).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.record_views(posts.iter().map(|p| p.id).collect()).await;
        Ok(posts)
    }

    async fn load(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.ctx
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))
    }

    async fn ensure_owner_exists(&self, owner: PostOwner) -> Result<(), DomainError> {
        let found = match owner {
            PostOwner::Author(id) => self.ctx.users.get_user(id).await.map(|_| ()),
            PostOwner::Project(id) => self.ctx.projects.get_project(id).await.map(|_| ()),
        };
        found.map_err(invalid_owner)
    }

    async fn ensure_owned_by(&self, post: &Post, caller: i64) -> Result<(), DomainError> {
        let owner_id = match post.owner {
            PostOwner::Author(id) => id,
            PostOwner::Project(id) => {
                self.ctx
                    .projects
                    .get_project(id)
                    .await
                    .map_err(invalid_owner)?
                    .owner_id
            }
        };
        if owner_id != caller {
            return Err(DomainError::Forbidden(format!(
                "User {} is not the owner of post {}",
                caller, post.id
            )));
        }
        Ok(())
    }

    async fn announce_published(&self, post: Post) {
        let this = self.clone();
        submit_background(self.pools.post_events.as_ref(), async move {
            if let Err(e) = this.ctx.events.post_cache(post.id).await {
                tracing::warn!(post_id = %post.id, error = %e, "Cache refresh signal not published");
            }
            let followers = this.author_followers(&post).await;
            this.refresh_cached_post(&post).await;
            this.emit(EventAction::Create, &post, &followers).await;
        })
        .await;
    }

    async fn fan_out_updated(&self, post: Post) {
        if post.deleted {
            let followers = self.author_followers(&post).await;
            self.emit(EventAction::Delete, &post, &followers).await;
        } else if post.published {
            self.refresh_cached_post(&post).await;
            self.emit(EventAction::Update, &post, &[]).await;
        }
    }

    /// Follower ids of the post's author, caching the author on the way.
    /// Project posts have no followers.
    async fn author_followers(&self, post: &Post) -> Vec<i64> {
        let Some(author_id) = post.author_id() else {
            return Vec::new();
        };
        match self.ctx.users.get_user(author_id).await {
            Ok(author) => {
                if let Err(e) = self.ctx.cache.update_or_cache_user(&author).await {
                    tracing::error!(user_id = author_id, error = %e, "Author cache write failed");
                }
                author.follower_ids
            }
            Err(e) => {
                tracing::warn!(post_id = %post.id, user_id = author_id, error = %e, "Cannot load followers");
                Vec::new()
            }
        }
    }

    async fn refresh_cached_post(&self, post: &Post) {
        if let Err(e) = self.ctx.cache.update_or_cache_post(post).await {
            tracing::error!(post_id = %post.id, error = %e, "Post cache write failed");
        }
    }

    async fn emit(&self, action: EventAction, post: &Post, followers: &[i64]) {
        let events = fanout::post_events(action, post, followers, self.settings.batch_size);
        let mut failed = 0usize;
        for event in &events {
            if let Err(e) = self.ctx.events.post_event(event).await {
                failed += 1;
                tracing::error!(post_id = %post.id, ?action, batch = event.follower_ids.len(), error = %e, "Post event not published");
            }
        }
        tracing::debug!(
            post_id = %post.id,
            ?action,
            followers = followers.len(),
            events = events.len(),
            failed,
            "Fan-out finished"
        );
    }

    async fn record_views(&self, post_ids: Vec<Uuid>) {
        if post_ids.is_empty() {
            return;
        }
        let events = self.ctx.events.clone();
        submit_background(self.pools.post_views.as_ref(), async move {
            let viewed_at = Utc::now();
            for post_id in post_ids {
                if let Err(e) = events.post_cache(post_id).await {
                    tracing::warn!(%post_id, error = %e, "Cache refresh signal not published");
                }
                if let Err(e) = events.post_view(post_id, viewed_at).await {
                    tracing::warn!(%post_id, error = %e, "View event not published");
                }
            }
        })
        .await;
    }
}

fn invalid_owner(err: DirectoryError) -> DomainError {
    DomainError::Validation(format!("Invalid post owner: {}", err))
}
