//! In-memory pub/sub implementation.
//!
//! This is a fallback when Redis is not available.
//! Works within a single process only, and messages are only kept while a
//! subscriber is listening.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;

use feedline_core::ports::{MessageHandler, PubSub, PubSubError, PubSubMessage};

/// In-memory pub/sub system.
pub struct InMemoryPubSub {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    subscriptions: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
    buffer_size: usize,
}

impl InMemoryPubSub {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(channel) {
            // Ignore send errors (no subscribers)
            let _ = sender.send(message.to_string());
            tracing::debug!(channel = %channel, "Message published");
        } else {
            tracing::debug!(channel = %channel, "No subscribers for channel");
        }

        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<(), PubSubError> {
        let mut receiver = {
            let mut channels = self.channels.write().await;
            channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(self.buffer_size).0)
                .subscribe()
        };
        let channel_name = channel.to_string();

        let handle = tokio::spawn(async move {
            tracing::info!(channel = %channel_name, "Subscribed to channel");

            loop {
                match receiver.recv().await {
                    Ok(payload) => {
                        let msg = PubSubMessage {
                            channel: channel_name.clone(),
                            payload,
                        };
                        handler(msg).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        tracing::warn!(
                            channel = %channel_name,
                            lagged = count,
                            "Subscriber lagged behind"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(channel = %channel_name, "Channel closed");
                        break;
                    }
                }
            }
        });

        self.subscriptions
            .lock()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(handle);

        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), PubSubError> {
        self.channels.write().await.remove(channel);
        if let Some(handles) = self.subscriptions.lock().await.remove(channel) {
            for handle in handles {
                handle.abort();
            }
        }
        tracing::info!(channel = %channel, "Unsubscribed from channel");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn forward(tx: mpsc::UnboundedSender<String>) -> MessageHandler {
        Box::new(move |msg| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(msg.payload);
            })
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = InMemoryPubSub::default();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        bus.subscribe("events", forward(tx1)).await.unwrap();
        bus.subscribe("events", forward(tx2)).await.unwrap();
        bus.publish("events", "hello").await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), rx1.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), rx2.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some("hello"));
        assert_eq!(second.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryPubSub::default();
        assert!(bus.publish("nobody", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = InMemoryPubSub::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.subscribe("events", forward(tx)).await.unwrap();
        bus.unsubscribe("events").await.unwrap();
        bus.publish("events", "late").await.unwrap();

        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(!matches!(received, Ok(Some(_))));
    }
}
