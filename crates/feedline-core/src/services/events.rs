use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    CommentEvent, HeatFeedEvent, PostCacheEvent, PostEvent, PostViewEvent, channels,
};
use crate::ports::{PubSub, PubSubError};

/// Typed, JSON-encoded publishing onto the event bus channels.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn PubSub>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn PubSub>) -> Self {
        Self { bus }
    }

    pub async fn publish<E: Serialize + Sync>(&self, channel: &str, event: &E) -> Result<(), PubSubError> {
        let payload =
            serde_json::to_string(event).map_err(|e| PubSubError::PublishError(e.to_string()))?;
        self.bus.publish(channel, &payload).await
    }

    pub async fn post_event(&self, event: &PostEvent) -> Result<(), PubSubError> {
        self.publish(channels::POST_EVENTS, event).await
    }

    pub async fn post_cache(&self, post_id: Uuid) -> Result<(), PubSubError> {
        self.publish(channels::POST_CACHE, &PostCacheEvent { post_id }).await
    }

    pub async fn post_view(&self, post_id: Uuid, viewed_at: DateTime<Utc>) -> Result<(), PubSubError> {
        self.publish(channels::POST_VIEWS, &PostViewEvent { post_id, viewed_at })
            .await
    }

    pub async fn comment_event(&self, event: &CommentEvent) -> Result<(), PubSubError> {
        self.publish(channels::COMMENT_EVENTS, event).await
    }

    pub async fn heat_feed(&self, event: &HeatFeedEvent) -> Result<(), PubSubError> {
        self.publish(channels::FEED_HEAT, event).await
    }
}
