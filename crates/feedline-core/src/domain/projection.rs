//! Read-cache projections.
//!
//! Every projection carries a `version` used for optimistic concurrency:
//! 1 on first write, +1 on every replacement.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::post::Post;
use super::user::DirectoryUser;

/// A denormalized, versioned record stored in the read cache.
pub trait Projection: Serialize + DeserializeOwned + Send + Sync {
    /// Short name used in logs.
    const KIND: &'static str;

    fn cache_key(&self) -> String;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedUser {
    pub id: i64,
    pub username: String,
    pub follower_ids: Vec<i64>,
    pub followee_ids: Vec<i64>,
    pub active: bool,
    pub version: u64,
}

impl CachedUser {
    pub fn key_for(user_id: i64) -> String {
        format!("user:{}", user_id)
    }

    pub fn from_user(user: &DirectoryUser, version: u64) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            follower_ids: user.follower_ids.clone(),
            followee_ids: user.followee_ids.clone(),
            active: user.active,
            version,
        }
    }
}

impl Projection for CachedUser {
    const KIND: &'static str = "user";

    fn cache_key(&self) -> String {
        Self::key_for(self.id)
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPost {
    pub id: Uuid,
    pub content: String,
    pub author_id: Option<i64>,
    pub project_id: Option<i64>,
    pub hashtags: Vec<String>,
    pub views: i64,
    pub published: bool,
    pub deleted: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl CachedPost {
    pub fn key_for(post_id: Uuid) -> String {
        format!("post:{}", post_id)
    }

    pub fn from_post(post: &Post, version: u64) -> Self {
        Self {
            id: post.id,
            content: post.content.clone(),
            author_id: post.author_id(),
            project_id: post.project_id(),
            hashtags: post.hashtags.clone(),
            views: post.views,
            published: post.published,
            deleted: post.deleted,
            published_at: post.published_at,
            updated_at: post.updated_at,
            version,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.published && !self.deleted
    }
}

impl Projection for CachedPost {
    const KIND: &'static str = "post";

    fn cache_key(&self) -> String {
        Self::key_for(self.id)
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub post_id: Uuid,
    pub published_at: Option<DateTime<Utc>>,
}

/// A user's feed: newest first, one entry per post, bounded length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFeed {
    pub user_id: i64,
    pub entries: Vec<FeedEntry>,
    pub version: u64,
}

impl CachedFeed {
    pub fn key_for(user_id: i64) -> String {
        format!("feed:{}", user_id)
    }

    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            entries: Vec::new(),
            version: 0,
        }
    }

    pub fn contains(&self, post_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.post_id == post_id)
    }

    /// Insert an entry, keeping the newest `capacity` entries. Returns false if
    /// the post was already present or is too old to make the cut.
    pub fn insert(&mut self, entry: FeedEntry, capacity: usize) -> bool {
        if self.contains(entry.post_id) {
            return false;
        }
        self.entries.push(entry);
        // `None` sorts before `Some`, so undated entries fall to the tail.
        self.entries
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));
        self.entries.truncate(capacity);
        self.contains(entry.post_id)
    }

    pub fn remove(&mut self, post_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.post_id != post_id);
        self.entries.len() != before
    }
}

impl Projection for CachedFeed {
    const KIND: &'static str = "feed";

    fn cache_key(&self) -> String {
        Self::key_for(self.user_id)
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(minutes_ago: i64) -> FeedEntry {
        FeedEntry {
            post_id: Uuid::new_v4(),
            published_at: Some(Utc::now() - Duration::minutes(minutes_ago)),
        }
    }

    #[test]
    fn test_feed_orders_newest_first_and_dedupes() {
        let mut feed = CachedFeed::empty(1);
        let old = entry(30);
        let new = entry(1);

        assert!(feed.insert(old, 10));
        assert!(feed.insert(new, 10));
        assert!(!feed.insert(old, 10));

        assert_eq!(feed.entries, vec![new, old]);
    }

    #[test]
    fn test_feed_capacity_drops_oldest() {
        let mut feed = CachedFeed::empty(1);
        let entries: Vec<_> = (0..5).map(entry).collect();
        for e in &entries {
            feed.insert(*e, 3);
        }
        assert_eq!(feed.entries.len(), 3);
        // entries[0] is the newest
        assert_eq!(feed.entries[0], entries[0]);
        assert!(!feed.contains(entries[4].post_id));

        // older than everything kept
        assert!(!feed.insert(entry(60), 3));
        assert_eq!(feed.entries.len(), 3);
    }

    #[test]
    fn test_feed_remove() {
        let mut feed = CachedFeed::empty(1);
        let e = entry(1);
        feed.insert(e, 10);
        assert!(feed.remove(e.post_id));
        assert!(!feed.remove(e.post_id));
        assert!(feed.entries.is_empty());
    }
}
