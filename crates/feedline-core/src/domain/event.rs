//! Change events published to the event bus.
//!
//! Events are fire-and-forget and delivered at least once; consumers must
//! tolerate duplicates and arbitrary ordering across batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::comment::Comment;
use super::post::Post;

/// Channel (topic) names on the event bus.
pub mod channels {
    pub const POST_EVENTS: &str = "post_events";
    pub const POST_CACHE: &str = "post_cache";
    pub const POST_VIEWS: &str = "post_views";
    pub const COMMENT_EVENTS: &str = "comment_events";
    pub const FEED_HEAT: &str = "feed_heat";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventAction {
    Create,
    Update,
    Delete,
}

/// Post lifecycle event targeting one batch of followers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEvent {
    pub action: EventAction,
    pub post_id: Uuid,
    pub published_at: Option<DateTime<Utc>>,
    pub follower_ids: Vec<i64>,
    pub post: Post,
}

impl PostEvent {
    pub fn new(action: EventAction, post: &Post, follower_ids: Vec<i64>) -> Self {
        Self {
            action,
            post_id: post.id,
            published_at: post.published_at,
            follower_ids,
            post: post.clone(),
        }
    }
}

/// Signal asking cache consumers to rebuild a post projection from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCacheEvent {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostViewEvent {
    pub post_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    pub action: EventAction,
    pub post_id: Uuid,
    pub comment: Comment,
}

/// Pre-warms one user's feed with one followee post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatFeedEvent {
    pub user_id: i64,
    pub post_id: Uuid,
    pub published_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostOwner;

    #[test]
    fn test_post_event_wire_format() {
        let post = Post::draft(PostOwner::Author(1), "hi".to_string(), vec![], None);
        let event = PostEvent::new(EventAction::Delete, &post, vec![]);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["action"], "DELETE");
        assert_eq!(json["postId"], post.id.to_string());
        assert_eq!(json["followerIds"], serde_json::json!([]));
    }
}
