//! Test doubles for service unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{
    Cache, CacheEntry, CacheError, MessageHandler, PoolStats, PubSub, PubSubError, Task, TaskPool,
};

/// Map-backed cache that can be told to fail upcoming writes with a conflict.
#[derive(Default)]
pub struct FakeCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    failing_writes: AtomicU32,
    write_attempts: AtomicUsize,
}

impl FakeCache {
    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn stored_version(&self, key: &str) -> Option<u64> {
        self.entries.lock().unwrap().get(key).map(|e| e.version)
    }

    fn injected_conflict(&self, key: &str) -> Result<(), CacheError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(CacheError::VersionConflict { key: key.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for FakeCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn insert(&self, key: &str, entry: CacheEntry, _ttl: Duration) -> Result<(), CacheError> {
        self.injected_conflict(key)?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(key) {
            return Err(CacheError::VersionConflict { key: key.to_string() });
        }
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        expected_version: u64,
        entry: CacheEntry,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        self.injected_conflict(key)?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(current) if current.version == expected_version => {
                entries.insert(key.to_string(), entry);
                Ok(())
            }
            _ => Err(CacheError::VersionConflict { key: key.to_string() }),
        }
    }
}

/// Bus that records every published message.
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingBus {
    pub fn messages(&self, channel: &str) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| serde_json::from_str(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl PubSub for RecordingBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }

    async fn subscribe(&self, _channel: &str, _handler: MessageHandler) -> Result<(), PubSubError> {
        Ok(())
    }

    async fn unsubscribe(&self, _channel: &str) -> Result<(), PubSubError> {
        Ok(())
    }
}

/// Runs each task to completion inside `submit`.
#[derive(Default)]
pub struct InlinePool {
    completed: AtomicUsize,
}

#[async_trait]
impl TaskPool for InlinePool {
    fn name(&self) -> &str {
        "inline"
    }

    async fn submit(&self, task: Task) -> Result<(), crate::ports::PoolError> {
        task.await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.completed.load(Ordering::SeqCst),
            ..PoolStats::default()
        }
    }
}
