use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::moderation::Moderatable;
use crate::error::DomainError;

/// Upper bound on post and comment content, in characters.
pub const MAX_CONTENT_LEN: usize = 4096;

/// Check that content is between 1 and [`MAX_CONTENT_LEN`] characters.
pub fn validate_content(content: &str) -> Result<(), DomainError> {
    let len = content.chars().count();
    if len == 0 || len > MAX_CONTENT_LEN {
        return Err(DomainError::Validation(format!(
            "Content should be at least 1 symbol long and max {} symbols, got {}",
            MAX_CONTENT_LEN, len
        )));
    }
    Ok(())
}

/// Who a post is attributed to. A post belongs to exactly one user or one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PostOwner {
    Author(i64),
    Project(i64),
}

impl PostOwner {
    /// Build an owner from the two optional references of a request.
    pub fn from_parts(author_id: Option<i64>, project_id: Option<i64>) -> Result<Self, DomainError> {
        match (author_id, project_id) {
            (Some(author), None) => Ok(Self::Author(author)),
            (None, Some(project)) => Ok(Self::Project(project)),
            (Some(_), Some(_)) => Err(DomainError::Validation(
                "The author can be either a user or a project".to_string(),
            )),
            (None, None) => Err(DomainError::Validation(
                "A post needs an author or a project".to_string(),
            )),
        }
    }

    pub fn author_id(&self) -> Option<i64> {
        match self {
            Self::Author(id) => Some(*id),
            Self::Project(_) => None,
        }
    }

    pub fn project_id(&self) -> Option<i64> {
        match self {
            Self::Project(id) => Some(*id),
            Self::Author(_) => None,
        }
    }
}

/// Lifecycle state derived from the `(published, deleted)` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostState {
    Draft,
    Published,
    DeletedDraft,
    DeletedPublished,
}

/// Input for a new draft.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: String,
    pub author_id: Option<i64>,
    pub project_id: Option<i64>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub hashtags: Vec<String>,
}

/// Changes requested by the owner of a post.
#[derive(Debug, Clone)]
pub struct PostRevision {
    pub post_id: Uuid,
    pub content: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Post entity - the canonical record owned by the post store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub owner: PostOwner,
    pub hashtags: Vec<String>,
    pub views: i64,
    pub published: bool,
    pub deleted: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub verified_date: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a new draft. Content and owner must already be validated.
    pub fn draft(
        owner: PostOwner,
        content: String,
        hashtags: Vec<String>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content,
            owner,
            hashtags: normalize_hashtags(hashtags),
            views: 0,
            published: false,
            deleted: false,
            verified: false,
            created_at: now,
            updated_at: now,
            published_at: None,
            scheduled_at,
            verified_date: None,
        }
    }

    pub fn state(&self) -> PostState {
        match (self.published, self.deleted) {
            (false, false) => PostState::Draft,
            (true, false) => PostState::Published,
            (false, true) => PostState::DeletedDraft,
            (true, true) => PostState::DeletedPublished,
        }
    }

    pub fn author_id(&self) -> Option<i64> {
        self.owner.author_id()
    }

    pub fn project_id(&self) -> Option<i64> {
        self.owner.project_id()
    }

    /// Published and not deleted.
    pub fn is_visible(&self) -> bool {
        self.published && !self.deleted
    }

    /// A draft whose schedule has come due.
    pub fn is_ready_to_publish(&self, now: DateTime<Utc>) -> bool {
        !self.published && !self.deleted && self.scheduled_at.is_some_and(|at| at <= now)
    }

    /// Manual publication.
    ///
    /// A draft whose `scheduled_at` has already passed is treated as published:
    /// it belongs to the scheduled publication path (see [`Post::publish_scheduled`]).
    pub fn publish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.published || self.scheduled_at.is_some_and(|at| at < now) {
            return Err(DomainError::AlreadyPublished(format!(
                "You can't publish post {}, that has been published",
                self.id
            )));
        }
        if self.deleted {
            return Err(DomainError::AlreadyDeleted(format!(
                "You can't publish post {}, that has been deleted",
                self.id
            )));
        }
        self.mark_published(now);
        Ok(())
    }

    /// Publication by the scheduler once `scheduled_at` has passed.
    pub fn publish_scheduled(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::AlreadyDeleted(format!(
                "Scheduled post {} has been deleted",
                self.id
            )));
        }
        if !self.is_ready_to_publish(now) {
            return Err(DomainError::AlreadyPublished(format!(
                "Post {} is not waiting for scheduled publication",
                self.id
            )));
        }
        self.mark_published(now);
        Ok(())
    }

    fn mark_published(&mut self, now: DateTime<Utc>) {
        self.published = true;
        self.published_at = Some(now);
        self.updated_at = now;
    }

    /// Apply an owner's edit. The schedule can only move later.
    pub fn revise(&mut self, content: String, scheduled_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        if let Some(requested) = scheduled_at {
            if self.scheduled_at.is_none_or(|current| requested > current) {
                self.scheduled_at = Some(requested);
            }
        }
        self.content = content;
        self.updated_at = now;
    }

    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::AlreadyDeleted(format!(
                "PostID: {} has been already deleted",
                self.id
            )));
        }
        self.deleted = true;
        self.updated_at = now;
        Ok(())
    }
}

impl Moderatable for Post {
    fn content(&self) -> &str {
        &self.content
    }

    fn needs_moderation(&self) -> bool {
        !self.verified || self.verified_date.is_none_or(|at| self.updated_at >= at)
    }

    fn apply_moderation(&mut self, passed: bool, now: DateTime<Utc>) {
        self.verified = passed;
        self.verified_date = Some(now);
    }
}

/// Trim, drop a leading `#`, lowercase and dedupe hashtags, keeping first-seen order.
pub fn normalize_hashtags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> Post {
        Post::draft(PostOwner::Author(42), "Hello world".to_string(), vec![], None)
    }

    #[test]
    fn test_content_bounds() {
        assert!(validate_content("").is_err());
        assert!(validate_content("a").is_ok());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_LEN)).is_ok());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_LEN + 1)).is_err());
        // Cyrillic letters count as one character each
        assert!(validate_content(&"ж".repeat(MAX_CONTENT_LEN)).is_ok());
    }

    #[test]
    fn test_owner_requires_exactly_one_reference() {
        assert_eq!(PostOwner::from_parts(Some(1), None).unwrap(), PostOwner::Author(1));
        assert_eq!(PostOwner::from_parts(None, Some(7)).unwrap(), PostOwner::Project(7));
        assert!(matches!(
            PostOwner::from_parts(Some(1), Some(7)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            PostOwner::from_parts(None, None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_new_draft_state() {
        let post = draft();
        assert_eq!(post.state(), PostState::Draft);
        assert!(!post.published && !post.deleted);
        assert_eq!(post.author_id(), Some(42));
        assert_eq!(post.project_id(), None);
    }

    #[test]
    fn test_publish_twice_fails() {
        let mut post = draft();
        let now = Utc::now();
        post.publish(now).unwrap();
        assert_eq!(post.state(), PostState::Published);
        assert_eq!(post.published_at, Some(now));
        assert!(matches!(post.publish(now), Err(DomainError::AlreadyPublished(_))));
    }

    #[test]
    fn test_publish_past_due_schedule_is_rejected() {
        let mut post = draft();
        let now = Utc::now();
        post.scheduled_at = Some(now - Duration::hours(1));
        assert!(matches!(post.publish(now), Err(DomainError::AlreadyPublished(_))));
        assert!(!post.published);
    }

    #[test]
    fn test_publish_future_schedule_is_allowed() {
        let mut post = draft();
        let now = Utc::now();
        post.scheduled_at = Some(now + Duration::hours(1));
        assert!(post.publish(now).is_ok());
    }

    #[test]
    fn test_publish_deleted_draft_fails() {
        let mut post = draft();
        let now = Utc::now();
        post.soft_delete(now).unwrap();
        assert_eq!(post.state(), PostState::DeletedDraft);
        assert!(matches!(post.publish(now), Err(DomainError::AlreadyDeleted(_))));
    }

    #[test]
    fn test_soft_delete_twice_fails() {
        let mut post = draft();
        let now = Utc::now();
        post.publish(now).unwrap();
        post.soft_delete(now).unwrap();
        assert_eq!(post.state(), PostState::DeletedPublished);
        assert!(matches!(post.soft_delete(now), Err(DomainError::AlreadyDeleted(_))));
    }

    #[test]
    fn test_scheduled_publication() {
        let mut post = draft();
        let now = Utc::now();
        assert!(!post.is_ready_to_publish(now));

        post.scheduled_at = Some(now + Duration::minutes(5));
        assert!(!post.is_ready_to_publish(now));
        assert!(post.publish_scheduled(now).is_err());

        post.scheduled_at = Some(now - Duration::minutes(5));
        assert!(post.is_ready_to_publish(now));
        post.publish_scheduled(now).unwrap();
        assert!(post.published);
        assert!(!post.is_ready_to_publish(now));
    }

    #[test]
    fn test_revise_only_extends_schedule() {
        let mut post = draft();
        let now = Utc::now();
        let current = now + Duration::days(1);
        post.scheduled_at = Some(current);

        let later = now + Duration::days(2);
        post.revise("edited".to_string(), Some(later), now);
        assert_eq!(post.scheduled_at, Some(later));
        assert_eq!(post.content, "edited");

        let earlier = now + Duration::hours(1);
        post.revise("edited again".to_string(), Some(earlier), now);
        assert_eq!(post.scheduled_at, Some(later));
        assert_eq!(post.content, "edited again");
    }

    #[test]
    fn test_revise_adopts_schedule_when_unset() {
        let mut post = draft();
        let now = Utc::now();
        let at = now + Duration::hours(3);
        post.revise("x".to_string(), Some(at), now);
        assert_eq!(post.scheduled_at, Some(at));
    }

    #[test]
    fn test_needs_moderation() {
        let mut post = draft();
        assert!(post.needs_moderation());

        let now = post.updated_at + Duration::seconds(1);
        post.apply_moderation(true, now);
        assert!(!post.needs_moderation());

        post.revise("changed".to_string(), None, now + Duration::seconds(1));
        assert!(post.needs_moderation());

        post.apply_moderation(false, now + Duration::seconds(2));
        assert!(post.needs_moderation());
    }

    #[test]
    fn test_normalize_hashtags() {
        let tags = normalize_hashtags(vec![
            "#Rust".to_string(),
            " rust ".to_string(),
            "".to_string(),
            "Async".to_string(),
        ]);
        assert_eq!(tags, vec!["rust".to_string(), "async".to_string()]);
    }
}
