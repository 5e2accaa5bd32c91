//! Redis Streams event bus.
//!
//! Every channel is a stream. Publishing appends with `XADD MAXLEN ~` and
//! subscribers tail the stream with `XREAD BLOCK` on their own connection.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use feedline_core::ports::{MessageHandler, PubSub, PubSubError, PubSubMessage};

use crate::cache::RedisConfig;

const PAYLOAD_FIELD: &str = "payload";
const READ_BLOCK_MS: usize = 5_000;
const READ_COUNT: usize = 100;

/// Redis-backed event bus.
pub struct RedisPubSub {
    conn: ConnectionManager,
    client: Client,
    subscriptions: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
    stream_max_len: usize,
}

impl RedisPubSub {
    pub async fn new(config: RedisConfig) -> Result<Self, PubSubError> {
        let (client, conn) = config.connect().await.map_err(PubSubError::Connection)?;

        tracing::info!(url = %config.url, max_len = config.stream_max_len, "Connected to Redis event bus");

        Ok(Self {
            conn,
            client,
            subscriptions: Mutex::new(HashMap::new()),
            stream_max_len: config.stream_max_len,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, PubSubError> {
        Self::new(RedisConfig::from_env()).await
    }
}

async fn tail_stream(client: Client, channel: String, handler: MessageHandler) {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(channel = %channel, error = %e, "Failed to open stream connection");
            return;
        }
    };

    tracing::debug!(channel = %channel, "Subscribed to Redis stream");

    // "$" only for the first read; afterwards resume from the last id seen.
    let mut last_id = "$".to_string();
    let options = StreamReadOptions::default().block(READ_BLOCK_MS).count(READ_COUNT);

    loop {
        let reply: redis::RedisResult<Option<StreamReadReply>> = conn
            .xread_options(&[channel.as_str()], &[last_id.as_str()], &options)
            .await;

        let reply = match reply {
            Ok(Some(reply)) => reply,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Stream read failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        for entry in reply.keys.into_iter().flat_map(|k| k.ids) {
            last_id = entry.id.clone();
            let Some(payload) = entry.get::<String>(PAYLOAD_FIELD) else {
                tracing::warn!(channel = %channel, id = %entry.id, "Stream entry without payload");
                continue;
            };
            handler(PubSubMessage {
                channel: channel.clone(),
                payload,
            })
            .await;
        }
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
        let mut conn = self.conn.clone();
        let _id: String = conn
            .xadd_maxlen(
                channel,
                StreamMaxlen::Approx(self.stream_max_len),
                "*",
                &[(PAYLOAD_FIELD, message)],
            )
            .await
            .map_err(|e| PubSubError::PublishError(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<(), PubSubError> {
        let handle = tokio::spawn(tail_stream(self.client.clone(), channel.to_string(), handler));

        self.subscriptions
            .lock()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(handle);

        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), PubSubError> {
        if let Some(handles) = self.subscriptions.lock().await.remove(channel) {
            for handle in handles {
                handle.abort();
            }
            tracing::debug!(channel = %channel, "Unsubscribed from Redis stream");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn get_test_pubsub() -> Option<RedisPubSub> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
            stream_max_len: 1_000,
        };

        RedisPubSub::new(config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_stream_pubsub() {
        let pubsub = match get_test_pubsub().await {
            Some(p) => p,
            None => return,
        };

        let channel = format!("test_stream:{}", uuid::Uuid::new_v4());
        let (tx, mut rx) = mpsc::channel(4);

        pubsub
            .subscribe(
                &channel,
                Box::new(move |msg| {
                    let tx = tx.clone();
                    Box::pin(async move {
                        tx.send(msg.payload).await.unwrap();
                    })
                }),
            )
            .await
            .unwrap();

        // Give some time for the first XREAD to block
        tokio::time::sleep(Duration::from_millis(200)).await;

        pubsub.publish(&channel, "first").await.unwrap();
        pubsub.publish(&channel, "second").await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some("first"));
        assert_eq!(second.as_deref(), Some("second"));

        pubsub.unsubscribe(&channel).await.unwrap();
    }
}
