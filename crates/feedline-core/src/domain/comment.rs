use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::moderation::Moderatable;

/// Input for a new comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: i64,
    pub content: String,
}

/// Comment entity - always attached to an existing post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: i64,
    pub content: String,
    pub verified: bool,
    pub verified_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, author_id: i64, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            verified: false,
            verified_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }

    pub fn revise(&mut self, content: String, now: DateTime<Utc>) {
        self.content = content;
        self.updated_at = now;
    }
}

impl Moderatable for Comment {
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
