//! In-memory post and comment stores - used when no database is configured.
//!
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use feedline_core::domain::{Comment, Moderatable, Page, PageRequest, Post};
use feedline_core::error::{DomainError, RepoError};
use feedline_core::ports::{BaseRepository, CommentRepository, PostMutation, PostRepository};

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect(&self, keep: impl Fn(&Post) -> bool) -> Vec<Post> {
        self.posts
            .read()
            .await
            .values()
            .filter(|p| keep(p))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        self.posts.write().await.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.posts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_author(&self, author_id: i64) -> Result<Vec<Post>, RepoError> {
        Ok(self.collect(|p| p.author_id() == Some(author_id)).await)
    }

    async fn find_by_project(&self, project_id: i64) -> Result<Vec<Post>, RepoError> {
        Ok(self.collect(|p| p.project_id() == Some(project_id)).await)
    }

    async fn find_by_hashtag(&self, hashtag: &str, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let mut found = self
            .collect(|p| p.is_visible() && p.hashtags.iter().any(|t| t == hashtag))
            .await;
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(found, page))
    }

    async fn find_not_verified(&self) -> Result<Vec<Post>, RepoError> {
        Ok(self.collect(|p| p.needs_moderation()).await)
    }

    async fn find_published_by_authors(&self, author_ids: &[i64], limit: u64) -> Result<Vec<Post>, RepoError> {
        let mut found = self
            .collect(|p| p.is_visible() && p.author_id().is_some_and(|a| author_ids.contains(&a)))
            .await;
        found.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn find_ready_to_publish(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let mut found = self.collect(|p| p.is_ready_to_publish(now)).await;
        found.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        Ok(found)
    }

    async fn increment_views(&self, post_id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        post.views += 1;
        Ok(())
    }

    async fn save_verifications(&self, posts: Vec<Post>) -> Result<(), RepoError> {
        let mut stored = self.posts.write().await;
        for item in posts {
            if let Some(current) = stored.get_mut(&item.id) {
                if current.updated_at == item.updated_at {
                    current.verified = item.verified;
                    current.verified_date = item.verified_date;
                }
            }
        }
        Ok(())
    }

    async fn with_transaction(&self, post_id: Uuid, mutation: PostMutation) -> Result<Post, DomainError> {
        let mut posts = self.posts.write().await;
        let mut working = posts
            .get(&post_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;

        mutation(&mut working)?;
        posts.insert(post_id, working.clone());
        Ok(working)
    }
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<HashMap<Uuid, Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn save(&self, entity: Comment) -> Result<Comment, RepoError> {
        self.comments.write().await.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.comments
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post(&self, post_id: Uuid, page: PageRequest) -> Result<Page<Comment>, RepoError> {
        let mut found: Vec<Comment> = self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(found, page))
    }

    async fn find_not_verified(&self) -> Result<Vec<Comment>, RepoError> {
        Ok(self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.needs_moderation())
            .cloned()
            .collect())
    }

    async fn save_verifications(&self, comments: Vec<Comment>) -> Result<(), RepoError> {
        let mut stored = self.comments.write().await;
        for item in comments {
            if let Some(current) = stored.get_mut(&item.id) {
                if current.updated_at == item.updated_at {
                    current.verified = item.verified;
                    current.verified_date = item.verified_date;
                }
            }
        }
        Ok(())
    }
}
