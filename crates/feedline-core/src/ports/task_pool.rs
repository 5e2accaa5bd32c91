//! Worker pool port - bounded queues for background work.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// A unit of background work. Tasks own everything they touch and report
/// their own failures through logging.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What `submit` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for a free slot.
    #[default]
    Block,
    /// Fail immediately with [`PoolError::QueueFull`].
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown overflow policy: {}", other)),
        }
    }
}

/// A fixed set of workers draining one bounded queue.
#[async_trait]
pub trait TaskPool: Send + Sync {
    /// Pool name, used in logs.
    fn name(&self) -> &str;

    /// Queue a task according to the pool's [`OverflowPolicy`].
    async fn submit(&self, task: Task) -> Result<(), PoolError>;

    /// Current pool statistics.
    fn stats(&self) -> PoolStats;
}

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub rejected: usize,
}

/// Worker pool errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Queue {0} is full")]
    QueueFull(String),

    #[error("Pool {0} is shut down")]
    Closed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_parse() {
        assert_eq!("block".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Block);
        assert_eq!(" Reject ".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Reject);
        assert!("drop".parse::<OverflowPolicy>().is_err());
    }
}
