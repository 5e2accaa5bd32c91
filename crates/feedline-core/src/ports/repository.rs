use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Comment, Page, PageRequest, Post};
use crate::error::{DomainError, RepoError};

/// Mutation applied to a post inside a store transaction. Returning an error
/// aborts the transaction.
pub type PostMutation = Box<dyn FnOnce(&mut Post) -> Result<(), DomainError> + Send>;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Post store.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn find_by_author(&self, author_id: i64) -> Result<Vec<Post>, RepoError>;

    async fn find_by_project(&self, project_id: i64) -> Result<Vec<Post>, RepoError>;

    /// Published, not deleted posts carrying `hashtag`, newest first.
    async fn find_by_hashtag(&self, hashtag: &str, page: PageRequest) -> Result<Page<Post>, RepoError>;

    /// Posts never verified or edited since their last verification.
    async fn find_not_verified(&self) -> Result<Vec<Post>, RepoError>;

    /// Most recent published, not deleted posts of the given authors.
    async fn find_published_by_authors(&self, author_ids: &[i64], limit: u64) -> Result<Vec<Post>, RepoError>;

    /// Drafts whose `scheduled_at` is at or before `now`.
    async fn find_ready_to_publish(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError>;

    /// Atomic `views = views + 1`.
    async fn increment_views(&self, post_id: Uuid) -> Result<(), RepoError>;

    /// Persist the moderation outcome (`verified`, `verified_date`) of a batch.
    /// Rows edited since they were read keep their previous outcome.
    async fn save_verifications(&self, posts: Vec<Post>) -> Result<(), RepoError>;

    /// Lock the post row, apply `mutation`, persist and commit.
    ///
    /// Fails with `NotFound` if the post does not exist. An error from the
    /// mutation leaves the stored row untouched.
    async fn with_transaction(&self, post_id: Uuid, mutation: PostMutation) -> Result<Post, DomainError>;
}

/// Comment store.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments of a post, newest first.
    async fn find_by_post(&self, post_id: Uuid, page: PageRequest) -> Result<Page<Comment>, RepoError>;

    async fn find_not_verified(&self) -> Result<Vec<Comment>, RepoError>;

    /// See [`PostRepository::save_verifications`].
    async fn save_verifications(&self, comments: Vec<Comment>) -> Result<(), RepoError>;
}
