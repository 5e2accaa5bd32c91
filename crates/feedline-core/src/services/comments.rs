use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::moderation::{ModerationSweep, save_batch};
use super::{ServiceContext, submit_background};
use crate::domain::{
    Comment, CommentEvent, DirectoryUser, EventAction, NewComment, Page, PageRequest,
    validate_content,
};
use crate::error::DomainError;
use crate::ports::TaskPool;

/// Comment lifecycle. Only the author may change or remove a comment.
#[derive(Clone)]
pub struct CommentService {
    ctx: ServiceContext,
    pool: Arc<dyn TaskPool>,
    moderation: Arc<ModerationSweep>,
}

impl CommentService {
    pub fn new(ctx: ServiceContext, pool: Arc<dyn TaskPool>, moderation: Arc<ModerationSweep>) -> Self {
        Self {
            ctx,
            pool,
            moderation,
        }
    }

    #[tracing::instrument(skip(self, new), fields(post_id = %new.post_id, author_id = new.author_id))]
    pub async fn create(&self, caller: i64, new: NewComment) -> Result<Comment, DomainError> {
        if caller != new.author_id {
            return Err(DomainError::Forbidden(format!(
                "User {} cannot comment on behalf of user {}",
                caller, new.author_id
            )));
        }
        validate_content(&new.content)?;

        let author = self.ctx.users.get_user(new.author_id).await.map_err(|e| {
            tracing::warn!(error = %e, "Comment author lookup failed");
            DomainError::not_found("User", new.author_id)
        })?;
        let post = self
            .ctx
            .posts
            .find_by_id(new.post_id)
            .await?
            .filter(|p| p.is_visible())
            .ok_or_else(|| DomainError::not_found("Post", new.post_id))?;

        let comment = self
            .ctx
            .comments
            .save(Comment::new(post.id, new.author_id, new.content))
            .await?;
        tracing::info!(comment_id = %comment.id, "Comment created");

        self.announce(EventAction::Create, comment.clone(), Some(author)).await;
        Ok(comment)
    }

    #[tracing::instrument(skip(self, content))]
    pub async fn update(&self, caller: i64, comment_id: Uuid, content: String) -> Result<Comment, DomainError> {
        validate_content(&content)?;
        let mut comment = self.load_own(caller, comment_id).await?;

        comment.revise(content, Utc::now());
        let comment = self.ctx.comments.save(comment).await?;
        tracing::info!("Comment updated");

        self.announce(EventAction::Update, comment.clone(), None).await;
        Ok(comment)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, caller: i64, comment_id: Uuid) -> Result<(), DomainError> {
        let comment = self.load_own(caller, comment_id).await?;
        self.ctx.comments.delete(comment_id).await?;
        tracing::info!("Comment deleted");

        self.announce(EventAction::Delete, comment, None).await;
        Ok(())
    }

    pub async fn list_by_post(&self, post_id: Uuid, page: PageRequest) -> Result<Page<Comment>, DomainError> {
        Ok(self.ctx.comments.find_by_post(post_id, page).await?)
    }

    /// Queue every unverified comment for moderation. Errors are logged.
    pub async fn do_moderation(&self) {
        let comments = match self.ctx.comments.find_not_verified().await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!(error = %e, "Cannot load comments for moderation");
                return;
            }
        };
        let store = self.ctx.comments.clone();
        let save = save_batch(move |batch: Vec<Comment>| {
            let store = store.clone();
            async move { store.save_verifications(batch).await }
        });
        self.moderation.submit("comment", comments, save).await;
    }

    async fn load_own(&self, caller: i64, comment_id: Uuid) -> Result<Comment, DomainError> {
        let comment = self
            .ctx
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment", comment_id))?;
        if !comment.is_authored_by(caller) {
            return Err(DomainError::Forbidden(format!(
                "User {} is not the author of comment {}",
                caller, comment_id
            )));
        }
        Ok(comment)
    }

    async fn announce(&self, action: EventAction, comment: Comment, author: Option<DirectoryUser>) {
        let ctx = self.ctx.clone();
        submit_background(self.pool.as_ref(), async move {
            let event = CommentEvent {
                action,
                post_id: comment.post_id,
                comment,
            };
            if let Err(e) = ctx.events.comment_event(&event).await {
                tracing::error!(comment_id = %event.comment.id, ?action, error = %e, "Comment event not published");
            }
            if let Some(author) = author {
                if let Err(e) = ctx.cache.update_or_cache_user(&author).await {
                    tracing::error!(user_id = author.id, error = %e, "Comment author cache write failed");
                }
            }
        })
        .await;
    }
}
